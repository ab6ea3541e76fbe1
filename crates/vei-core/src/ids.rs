/// A deterministic per-type id sequence (section 4.6.5: CRM "creates
/// deterministic ids with per-type sequences (`C-`, `CO-`, `D-`)"). Each
/// provider owns one `IdSequence` per id family it mints.
#[derive(Debug, Clone)]
pub struct IdSequence {
    prefix: String,
    next: u64,
}

impl IdSequence {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }

    pub fn next_id(&mut self) -> String {
        let id = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_increments_and_prefixes() {
        let mut seq = IdSequence::new("C-");
        assert_eq!(seq.next_id(), "C-1");
        assert_eq!(seq.next_id(), "C-2");
        assert_eq!(seq.next_id(), "C-3");
    }
}
