//! Fabric controller commands.

use crate::error::{FabricError, FabricResult};
use std::fmt;
use std::str::FromStr;

/// Name of a fabric controller command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FabricOperation {
    /// Create a virtual fabric with a partition key.
    Create,
    /// Delete a virtual fabric.
    Delete,
    /// Add members to a virtual fabric.
    Add,
    /// Remove members from a virtual fabric.
    Remove,
    /// Commit staged configuration.
    Commit,
    /// Reload the controller with committed configuration.
    Reload,
    /// Restart the controller.
    Restart,
    /// Discard staged configuration.
    Reset,
    /// Kill any outstanding controller process.
    Abort,
    /// Query whether a virtual fabric exists.
    Exist,
    /// Query whether members belong to a virtual fabric.
    IsMember,
    /// Query whether members are absent from a virtual fabric.
    IsNotMember,
}

impl FabricOperation {
    /// Every operation the controller accepts.
    pub const ALL: [FabricOperation; 12] = [
        FabricOperation::Create,
        FabricOperation::Delete,
        FabricOperation::Add,
        FabricOperation::Remove,
        FabricOperation::Commit,
        FabricOperation::Reload,
        FabricOperation::Restart,
        FabricOperation::Reset,
        FabricOperation::Abort,
        FabricOperation::Exist,
        FabricOperation::IsMember,
        FabricOperation::IsNotMember,
    ];

    /// Returns the controller's name for this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FabricOperation::Create => "create",
            FabricOperation::Delete => "delete",
            FabricOperation::Add => "add",
            FabricOperation::Remove => "remove",
            FabricOperation::Commit => "commit",
            FabricOperation::Reload => "reload",
            FabricOperation::Restart => "restart",
            FabricOperation::Reset => "reset",
            FabricOperation::Abort => "abort",
            FabricOperation::Exist => "exist",
            FabricOperation::IsMember => "ismember",
            FabricOperation::IsNotMember => "isnotmember",
        }
    }

    /// Returns true for commands that take no target.
    pub fn is_management(&self) -> bool {
        matches!(
            self,
            FabricOperation::Commit
                | FabricOperation::Reload
                | FabricOperation::Restart
                | FabricOperation::Reset
                | FabricOperation::Abort
        )
    }
}

impl fmt::Display for FabricOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FabricOperation {
    type Err = FabricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FabricOperation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| FabricError::UnknownCommand(s.to_string()))
    }
}

/// A fully specified controller command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FabricCommand {
    /// `create <name> --pkey <key>`
    Create {
        /// Virtual fabric name.
        name: String,
        /// Partition key.
        key: u64,
    },
    /// `delete <name>`
    Delete {
        /// Virtual fabric name.
        name: String,
    },
    /// `add <name> <members...>`
    Add {
        /// Virtual fabric name.
        name: String,
        /// Member identifiers.
        members: Vec<String>,
    },
    /// `remove <name> <members...>`
    Remove {
        /// Virtual fabric name.
        name: String,
        /// Member identifiers.
        members: Vec<String>,
    },
    /// `exist <name>`
    Exist {
        /// Virtual fabric name.
        name: String,
    },
    /// `ismember <name> <members...>`
    IsMember {
        /// Virtual fabric name.
        name: String,
        /// Member identifiers.
        members: Vec<String>,
    },
    /// `isnotmember <name> <members...>`
    IsNotMember {
        /// Virtual fabric name.
        name: String,
        /// Member identifiers.
        members: Vec<String>,
    },
    /// A command without a target.
    Management(FabricOperation),
}

impl FabricCommand {
    /// Builds a command from an operation name, a target, and arguments.
    ///
    /// `target` names the virtual fabric and is ignored for management
    /// commands. For `create` the single argument is the partition key; for
    /// membership commands the arguments are the members.
    ///
    /// # Errors
    ///
    /// Returns [`FabricError::UnknownCommand`] for names the controller does
    /// not accept, or an argument error when required inputs are missing.
    pub fn parse(operation: &str, target: Option<&str>, args: &[String]) -> FabricResult<Self> {
        let op: FabricOperation = operation.parse()?;
        if op.is_management() {
            return Ok(FabricCommand::Management(op));
        }

        let name = target
            .filter(|t| !t.is_empty())
            .ok_or(FabricError::MissingArgument {
                operation: op.as_str(),
                argument: "a fabric name",
            })?
            .to_string();

        let members = || -> FabricResult<Vec<String>> {
            if args.is_empty() {
                return Err(FabricError::MissingArgument {
                    operation: op.as_str(),
                    argument: "at least one member",
                });
            }
            Ok(args.to_vec())
        };

        Ok(match op {
            FabricOperation::Create => {
                let raw = args.first().ok_or(FabricError::MissingArgument {
                    operation: op.as_str(),
                    argument: "a partition key",
                })?;
                let key = raw.parse().map_err(|_| FabricError::InvalidArgument {
                    operation: op.as_str(),
                    message: format!("partition key '{raw}' is not a number"),
                })?;
                FabricCommand::Create { name, key }
            }
            FabricOperation::Delete => FabricCommand::Delete { name },
            FabricOperation::Exist => FabricCommand::Exist { name },
            FabricOperation::Add => FabricCommand::Add {
                name,
                members: members()?,
            },
            FabricOperation::Remove => FabricCommand::Remove {
                name,
                members: members()?,
            },
            FabricOperation::IsMember => FabricCommand::IsMember {
                name,
                members: members()?,
            },
            FabricOperation::IsNotMember => FabricCommand::IsNotMember {
                name,
                members: members()?,
            },
            _ => FabricCommand::Management(op),
        })
    }

    /// Returns the operation of this command.
    pub fn operation(&self) -> FabricOperation {
        match self {
            FabricCommand::Create { .. } => FabricOperation::Create,
            FabricCommand::Delete { .. } => FabricOperation::Delete,
            FabricCommand::Add { .. } => FabricOperation::Add,
            FabricCommand::Remove { .. } => FabricOperation::Remove,
            FabricCommand::Exist { .. } => FabricOperation::Exist,
            FabricCommand::IsMember { .. } => FabricOperation::IsMember,
            FabricCommand::IsNotMember { .. } => FabricOperation::IsNotMember,
            FabricCommand::Management(op) => *op,
        }
    }

    /// Returns the virtual fabric this command targets, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            FabricCommand::Create { name, .. }
            | FabricCommand::Delete { name }
            | FabricCommand::Add { name, .. }
            | FabricCommand::Remove { name, .. }
            | FabricCommand::Exist { name }
            | FabricCommand::IsMember { name, .. }
            | FabricCommand::IsNotMember { name, .. } => Some(name),
            FabricCommand::Management(_) => None,
        }
    }

    /// Returns the members this command carries.
    pub fn members(&self) -> &[String] {
        match self {
            FabricCommand::Add { members, .. }
            | FabricCommand::Remove { members, .. }
            | FabricCommand::IsMember { members, .. }
            | FabricCommand::IsNotMember { members, .. } => members,
            _ => &[],
        }
    }

    /// Renders the controller command line.
    ///
    /// `abort` is not a controller subcommand; it kills the controller
    /// binary instead.
    pub fn argv(&self, binary: &str) -> Vec<String> {
        let mut argv = vec![binary.to_string()];
        match self {
            FabricCommand::Create { name, key } => {
                argv.extend(["create".into(), name.clone(), "--pkey".into(), key.to_string()]);
            }
            FabricCommand::Delete { name } | FabricCommand::Exist { name } => {
                argv.extend([self.operation().as_str().to_string(), name.clone()]);
            }
            FabricCommand::Add { name, members }
            | FabricCommand::Remove { name, members }
            | FabricCommand::IsMember { name, members }
            | FabricCommand::IsNotMember { name, members } => {
                argv.extend([self.operation().as_str().to_string(), name.clone()]);
                argv.extend(members.iter().cloned());
            }
            FabricCommand::Management(FabricOperation::Abort) => {
                argv = vec!["killall".into(), "-9".into(), binary.to_string()];
            }
            FabricCommand::Management(FabricOperation::Commit) => {
                argv.extend(["commit".into(), "-f".into()]);
            }
            FabricCommand::Management(op) => argv.push(op.as_str().to_string()),
        }
        argv
    }
}

impl fmt::Display for FabricCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation().as_str())?;
        if let Some(target) = self.target() {
            write!(f, " {target}")?;
        }
        if let FabricCommand::Create { key, .. } = self {
            write!(f, " --pkey {key}")?;
        }
        for member in self.members() {
            write!(f, " {member}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn operation_names() {
        for op in FabricOperation::ALL {
            assert_eq!(op.as_str().parse::<FabricOperation>().unwrap(), op);
        }
        assert!(matches!(
            "explode".parse::<FabricOperation>(),
            Err(FabricError::UnknownCommand(name)) if name == "explode"
        ));
    }

    #[test]
    fn parse_create() {
        let cmd = FabricCommand::parse("create", Some("n1"), &strings(&["42"])).unwrap();
        assert_eq!(
            cmd,
            FabricCommand::Create {
                name: "n1".into(),
                key: 42
            }
        );
        assert_eq!(cmd.argv("opafmvf"), strings(&["opafmvf", "create", "n1", "--pkey", "42"]));
    }

    #[test]
    fn parse_create_requires_numeric_key() {
        assert!(matches!(
            FabricCommand::parse("create", Some("n1"), &[]),
            Err(FabricError::MissingArgument { .. })
        ));
        assert!(matches!(
            FabricCommand::parse("create", Some("n1"), &strings(&["ten"])),
            Err(FabricError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn parse_membership_commands() {
        let cmd = FabricCommand::parse("add", Some("n1"), &strings(&["g1", "g2"])).unwrap();
        assert_eq!(cmd.members(), ["g1", "g2"]);
        assert_eq!(cmd.argv("opafmvf"), strings(&["opafmvf", "add", "n1", "g1", "g2"]));

        let cmd = FabricCommand::parse("isnotmember", Some("n1"), &strings(&["g1"])).unwrap();
        assert_eq!(cmd.argv("opafmvf"), strings(&["opafmvf", "isnotmember", "n1", "g1"]));

        assert!(matches!(
            FabricCommand::parse("remove", Some("n1"), &[]),
            Err(FabricError::MissingArgument { .. })
        ));
        assert!(matches!(
            FabricCommand::parse("add", None, &strings(&["g1"])),
            Err(FabricError::MissingArgument { .. })
        ));
    }

    #[test]
    fn management_commands_ignore_target() {
        let cmd = FabricCommand::parse("commit", Some("ignored"), &[]).unwrap();
        assert_eq!(cmd, FabricCommand::Management(FabricOperation::Commit));
        assert_eq!(cmd.target(), None);
        assert_eq!(cmd.argv("opafmvf"), strings(&["opafmvf", "commit", "-f"]));

        let reload = FabricCommand::Management(FabricOperation::Reload);
        assert_eq!(reload.argv("opafmvf"), strings(&["opafmvf", "reload"]));
    }

    #[test]
    fn abort_kills_controller() {
        let cmd = FabricCommand::Management(FabricOperation::Abort);
        assert_eq!(cmd.argv("opafmvf"), strings(&["killall", "-9", "opafmvf"]));
    }

    #[test]
    fn unknown_command_is_a_value() {
        let result = FabricCommand::parse("explode", Some("n1"), &[]);
        assert!(matches!(result, Err(FabricError::UnknownCommand(_))));
    }

    #[test]
    fn display() {
        let cmd = FabricCommand::Create {
            name: "n1".into(),
            key: 7,
        };
        assert_eq!(cmd.to_string(), "create n1 --pkey 7");
        let cmd = FabricCommand::Remove {
            name: "n1".into(),
            members: strings(&["g1", "g2"]),
        };
        assert_eq!(cmd.to_string(), "remove n1 g1 g2");
    }
}
