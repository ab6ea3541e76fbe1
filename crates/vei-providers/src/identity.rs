use std::collections::HashMap;

use serde_json::{Value, json};
use vei_core::{DeterministicRng, IdSequence};
use vei_types::domain::identity::{Application, Group, User, UserStatus};
use vei_types::{IdentitySeed, Scheduler, ToolSpec};

use crate::McpError;

/// Okta-like identity (section 4.6.6).
pub struct IdentityProvider {
    users: HashMap<String, User>,
    groups: HashMap<String, Group>,
    apps: HashMap<String, Application>,
    user_seq: IdSequence,
    group_seq: IdSequence,
    app_seq: IdSequence,
}

impl IdentityProvider {
    pub fn new(seed: IdentitySeed) -> Self {
        let users = seed.users.into_iter().map(|u| (u.id.clone(), u)).collect();
        let groups = seed.groups.into_iter().map(|g| (g.id.clone(), g)).collect();
        let apps = seed.applications.into_iter().map(|a| (a.id.clone(), a)).collect();
        Self {
            users,
            groups,
            apps,
            user_seq: IdSequence::new("U-"),
            group_seq: IdSequence::new("G-"),
            app_seq: IdSequence::new("APP-"),
        }
    }

    fn create_user(&mut self, args: &Value) -> Value {
        let id = self.user_seq.next_id();
        self.users.insert(
            id.clone(),
            User {
                id: id.clone(),
                login: args.get("login").and_then(Value::as_str).unwrap_or_default().to_string(),
                email: args.get("email").and_then(Value::as_str).unwrap_or_default().to_string(),
                status: UserStatus::Provisioned,
                group_ids: Vec::new(),
            },
        );
        json!({ "id": id })
    }

    fn create_group(&mut self, args: &Value) -> Value {
        let id = self.group_seq.next_id();
        self.groups.insert(
            id.clone(),
            Group { id: id.clone(), name: args.get("name").and_then(Value::as_str).unwrap_or_default().to_string(), member_ids: Vec::new() },
        );
        json!({ "id": id })
    }

    fn create_app(&mut self, args: &Value) -> Value {
        let id = self.app_seq.next_id();
        self.apps.insert(
            id.clone(),
            Application { id: id.clone(), label: args.get("label").and_then(Value::as_str).unwrap_or_default().to_string(), assigned_user_ids: Vec::new() },
        );
        json!({ "id": id })
    }

    fn assign_to_group(&mut self, args: &Value) -> Result<Value, McpError> {
        let user_id = args.get("user_id").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("assign_to_group requires `user_id`"))?;
        let group_id = args.get("group_id").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("assign_to_group requires `group_id`"))?;
        if !self.users.contains_key(user_id) {
            return Err(McpError::okta_user_not_found(user_id));
        }
        if !self.groups.contains_key(group_id) {
            return Err(McpError::okta_group_not_found(group_id));
        }
        let user = self.users.get_mut(user_id).expect("checked above");
        if !user.group_ids.contains(&group_id.to_string()) {
            user.group_ids.push(group_id.to_string());
        }
        let group = self.groups.get_mut(group_id).expect("checked above");
        if !group.member_ids.contains(&user_id.to_string()) {
            group.member_ids.push(user_id.to_string());
        }
        Ok(json!({ "user_id": user_id, "group_id": group_id }))
    }

    fn assign_app(&mut self, args: &Value) -> Result<Value, McpError> {
        let user_id = args.get("user_id").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("assign_app requires `user_id`"))?;
        let app_id = args.get("app_id").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("assign_app requires `app_id`"))?;
        if !self.users.contains_key(user_id) {
            return Err(McpError::okta_user_not_found(user_id));
        }
        let Some(app) = self.apps.get_mut(app_id) else {
            return Err(McpError::okta_app_not_found(app_id));
        };
        if !app.assigned_user_ids.contains(&user_id.to_string()) {
            app.assigned_user_ids.push(user_id.to_string());
        }
        Ok(json!({ "user_id": user_id, "app_id": app_id }))
    }

    fn suspend_user(&mut self, args: &Value) -> Result<Value, McpError> {
        let user_id = args.get("user_id").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("suspend_user requires `user_id`"))?;
        let Some(user) = self.users.get_mut(user_id) else {
            return Err(McpError::okta_user_not_found(user_id));
        };
        user.status = UserStatus::Suspended;
        Ok(json!({ "user_id": user_id, "status": user.status }))
    }

    fn deprovision_user(&mut self, args: &Value) -> Result<Value, McpError> {
        let user_id = args.get("user_id").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("deprovision_user requires `user_id`"))?;
        let Some(user) = self.users.get_mut(user_id) else {
            return Err(McpError::okta_user_not_found(user_id));
        };
        user.status = UserStatus::Deprovisioned;
        Ok(json!({ "user_id": user_id, "status": user.status }))
    }

    fn reset_password(&mut self, args: &Value) -> Result<Value, McpError> {
        let user_id = args.get("user_id").and_then(Value::as_str).ok_or_else(|| McpError::invalid_args("reset_password requires `user_id`"))?;
        let Some(user) = self.users.get(user_id) else {
            return Err(McpError::okta_user_not_found(user_id));
        };
        if user.status == UserStatus::Deprovisioned {
            return Err(McpError::okta_invalid_state(format!("{user_id} is DEPROVISIONED")));
        }
        Ok(json!({ "user_id": user_id, "reset": true }))
    }
}

impl crate::ToolProvider for IdentityProvider {
    fn specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new("okta.create_user", "Provision a user").permissions(["identity.write"]).returns("{id}"),
            ToolSpec::new("okta.create_group", "Create a group").permissions(["identity.write"]).returns("{id}"),
            ToolSpec::new("okta.create_app", "Create an application").permissions(["identity.write"]).returns("{id}"),
            ToolSpec::new("okta.assign_to_group", "Add a user to a group, mirrored both sides").permissions(["identity.write"]).returns("{user_id, group_id}"),
            ToolSpec::new("okta.assign_app", "Assign an application to a user").permissions(["identity.write"]).returns("{user_id, app_id}"),
            ToolSpec::new("okta.suspend_user", "Suspend a user").permissions(["identity.write"]).returns("{user_id, status}"),
            ToolSpec::new("okta.deprovision_user", "Deprovision a user").permissions(["identity.write"]).returns("{user_id, status}"),
            ToolSpec::new("okta.reset_password", "Reset a user's password").permissions(["identity.write"]).returns("{user_id, reset}"),
        ]
    }

    fn handles(&self, tool: &str) -> bool {
        tool.starts_with("okta.")
    }

    fn call(
        &mut self,
        tool: &str,
        args: &Value,
        _rng: &mut DeterministicRng,
        _scheduler: &mut dyn Scheduler,
    ) -> Result<Value, McpError> {
        match tool {
            "okta.create_user" => Ok(self.create_user(args)),
            "okta.create_group" => Ok(self.create_group(args)),
            "okta.create_app" => Ok(self.create_app(args)),
            "okta.assign_to_group" => self.assign_to_group(args),
            "okta.assign_app" => self.assign_app(args),
            "okta.suspend_user" => self.suspend_user(args),
            "okta.deprovision_user" => self.deprovision_user(args),
            "okta.reset_password" => self.reset_password(args),
            _ => Err(McpError::unsupported_tool(tool)),
        }
    }

    fn domain_tag(&self) -> &'static str {
        "identity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolProvider;

    struct NoopBus;
    impl Scheduler for NoopBus {
        fn schedule(&mut self, _dt_ms: u64, _target: &str, _payload: vei_types::Payload) {}
        fn clock_ms(&self) -> u64 {
            0
        }
    }

    #[test]
    fn group_assignment_mirrors_membership_both_sides() {
        let mut p = IdentityProvider::new(IdentitySeed::default());
        let mut rng = DeterministicRng::new(1);
        let mut bus = NoopBus;
        let user = p.create_user(&json!({"login": "jdoe", "email": "j@x.example"}));
        let group = p.create_group(&json!({"name": "engineers"}));
        let uid = user["id"].as_str().unwrap().to_string();
        let gid = group["id"].as_str().unwrap().to_string();
        p.call("okta.assign_to_group", &json!({"user_id": uid, "group_id": gid}), &mut rng, &mut bus).unwrap();
        assert!(p.users[&uid].group_ids.contains(&gid));
        assert!(p.groups[&gid].member_ids.contains(&uid));
    }

    #[test]
    fn password_reset_on_deprovisioned_user_is_invalid_state() {
        let mut p = IdentityProvider::new(IdentitySeed::default());
        let mut rng = DeterministicRng::new(1);
        let mut bus = NoopBus;
        let user = p.create_user(&json!({"login": "jdoe", "email": "j@x.example"}));
        let uid = user["id"].as_str().unwrap().to_string();
        p.call("okta.deprovision_user", &json!({"user_id": uid}), &mut rng, &mut bus).unwrap();
        let err = p.call("okta.reset_password", &json!({"user_id": uid}), &mut rng, &mut bus).unwrap_err();
        assert_eq!(err.code, "okta.invalid_state");
    }

    #[test]
    fn unknown_user_is_a_typed_error() {
        let mut p = IdentityProvider::new(IdentitySeed::default());
        let mut rng = DeterministicRng::new(1);
        let mut bus = NoopBus;
        let err = p.call("okta.suspend_user", &json!({"user_id": "U-999"}), &mut rng, &mut bus).unwrap_err();
        assert_eq!(err.code, "okta.user_not_found");
    }
}
