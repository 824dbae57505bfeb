// Signed-in principal as handed over by the identity provider
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Operator,
    Manager,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Operator" => Ok(Role::Operator),
            "Manager" => Ok(Role::Manager),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub username: Option<String>,
    pub role: Option<Role>,
}

impl Principal {
    pub fn new(username: Option<String>, role: Option<Role>) -> Self {
        Self { username, role }
    }

    pub fn can_export_reports(&self) -> bool {
        self.role == Some(Role::Manager)
    }
}
