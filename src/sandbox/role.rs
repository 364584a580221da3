use anyhow::anyhow;

/* The fixed set of sandbox identities. Each role owns exactly one policy
 * file name, resolved against the layered configuration search path. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    Chipset,
    PrivApp,
    App,
}

impl Role {
    pub const ALL: [Role; 4] =
        [Role::System, Role::Chipset, Role::PrivApp, Role::App];

    /* Policy file path relative to each configuration layer. */
    pub fn config_name(self) -> &'static str {
        match self {
            Role::System => "etc/sandbox/system-sandbox.json",
            Role::Chipset => "etc/sandbox/chipset-sandbox.json",
            Role::PrivApp => "etc/sandbox/priv-app-sandbox.json",
            Role::App => "etc/sandbox/app-sandbox.json",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::System => "system",
            Role::Chipset => "chipset",
            Role::PrivApp => "priv-app",
            Role::App => "app",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "chipset" => Ok(Role::Chipset),
            "priv-app" => Ok(Role::PrivApp),
            "app" => Ok(Role::App),
            _ => Err(anyhow!("unknown sandbox name '{}'", s)),
        }
    }
}
