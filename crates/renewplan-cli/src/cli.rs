//! Command line definitions.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use renewplan_core::models::Level;
use renewplan_core::BalancingMode;

/// Admin tool for the renewal plan recommendation service
#[derive(Parser, Debug)]
#[command(name = "renewplan")]
#[command(about = "Browse the B1/B2/B3 hierarchy and configure recommendation percentages")]
pub struct Args {
    /// API base URL (overrides the config file)
    #[arg(long, env = "RENEWPLAN_API_URL", global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in as an admin and save the session
    Login {
        #[arg(long, short)]
        username: Option<String>,

        /// Store the password in the OS keychain
        #[arg(long)]
        remember: bool,
    },

    /// Forget the saved session and any remembered password
    Logout,

    /// Show the logged-in user and check the session with the server
    Whoami,

    /// List top-level (B1) values
    B1,

    /// List B2 values under a B1 with their percentages
    B2 { b1: String },

    /// List B3 values under a B1/B2 pair with their percentages
    B3 { b1: String, b2: String },

    /// Show detail breakdowns for one B3, or for every B3 under a B2
    Details {
        b1: String,
        b2: String,
        b3: Option<String>,
    },

    /// Edit percentages for a selection and save them
    Configure {
        #[arg(long)]
        b1: String,

        #[arg(long)]
        b2: Option<String>,

        #[arg(long)]
        b3: Option<String>,

        /// Balancing mode for this run (defaults to the configured mode)
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Reset a level to an even split of 100 before applying edits
        #[arg(long = "even", value_enum)]
        even: Vec<LevelArg>,

        /// Edit in the form LEVEL:VALUE=PERCENT, e.g. b2:Upgrade=70
        #[arg(long = "set", value_parser = parse_edit)]
        edits: Vec<Edit>,

        /// Show the result without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove every percentage override
    ClearConfigs {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Migrate stored overrides to the server's current schema
    Migrate,

    /// Upload a spreadsheet to replace the hierarchy data
    Import { file: PathBuf },

    /// Manage the phone brand list
    Brands {
        #[command(subcommand)]
        action: BrandAction,
    },

    /// Show or change local settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum BrandAction {
    List,
    Add { name: String, percentage: f64 },
    Update { id: String, name: String, percentage: f64 },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    Show,
    SetMode {
        #[arg(value_enum)]
        mode: ModeArg,
    },
    SetUrl { url: String },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Auto,
    Manual,
}

impl From<ModeArg> for BalancingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => BalancingMode::Auto,
            ModeArg::Manual => BalancingMode::Manual,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelArg {
    B2,
    B3,
    Detail,
}

impl From<LevelArg> for Level {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::B2 => Level::B2,
            LevelArg::B3 => Level::B3,
            LevelArg::Detail => Level::Detail,
        }
    }
}

/// One `--set` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub level: Level,
    pub value: String,
    pub percentage: i32,
}

fn parse_level(s: &str) -> Result<Level> {
    match s.to_ascii_lowercase().as_str() {
        "b2" => Ok(Level::B2),
        "b3" => Ok(Level::B3),
        "detail" | "d" => Ok(Level::Detail),
        other => bail!("unknown level '{}', expected b2, b3 or detail", other),
    }
}

pub fn parse_edit(s: &str) -> Result<Edit> {
    let (level, rest) = s
        .split_once(':')
        .ok_or_else(|| anyhow!("expected LEVEL:VALUE=PERCENT, got '{}'", s))?;
    let (value, percentage) = rest
        .rsplit_once('=')
        .ok_or_else(|| anyhow!("expected LEVEL:VALUE=PERCENT, got '{}'", s))?;
    if value.is_empty() {
        bail!("missing value name in '{}'", s);
    }
    let percentage = percentage
        .trim()
        .parse::<i32>()
        .map_err(|_| anyhow!("percentage must be a whole number in '{}'", s))?;

    Ok(Edit {
        level: parse_level(level.trim())?,
        value: value.to_string(),
        percentage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edit() {
        let edit = parse_edit("b2:Upgrade=70").expect("valid edit");
        assert_eq!(
            edit,
            Edit {
                level: Level::B2,
                value: "Upgrade".to_string(),
                percentage: 70
            }
        );
    }

    #[test]
    fn test_parse_edit_value_with_separators() {
        let edit = parse_edit("detail:Plan: 5G=Max=15").expect("valid edit");
        assert_eq!(edit.level, Level::Detail);
        assert_eq!(edit.value, "Plan: 5G=Max");
        assert_eq!(edit.percentage, 15);
    }

    #[test]
    fn test_parse_edit_negative_is_left_to_the_buffer() {
        assert_eq!(parse_edit("b3:x=-5").expect("parses").percentage, -5);
    }

    #[test]
    fn test_parse_edit_errors() {
        assert!(parse_edit("Upgrade=70").is_err());
        assert!(parse_edit("b2:Upgrade").is_err());
        assert!(parse_edit("b4:Upgrade=70").is_err());
        assert!(parse_edit("b2:=70").is_err());
        assert!(parse_edit("b2:Upgrade=seventy").is_err());
    }

    #[test]
    fn test_args_parse_configure() {
        let args = Args::try_parse_from([
            "renewplan",
            "configure",
            "--b1",
            "Premium",
            "--b2",
            "Upgrade",
            "--set",
            "b2:Upgrade=70",
            "--even",
            "b3",
            "--dry-run",
        ])
        .expect("valid args");
        match args.command {
            Command::Configure { b1, b2, edits, even, dry_run, .. } => {
                assert_eq!(b1, "Premium");
                assert_eq!(b2.as_deref(), Some("Upgrade"));
                assert_eq!(edits.len(), 1);
                assert_eq!(even, vec![LevelArg::B3]);
                assert!(dry_run);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
