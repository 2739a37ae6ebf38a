//! Configuration types for the household ledger.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::{FairflatError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FairflatConfig {
    /// Identity allowlist, in rotation tie-break order.
    pub members: Vec<MemberConfig>,
    /// Task catalogue.
    pub tasks: Vec<TaskDefinition>,
    /// Penalty catalogue.
    pub penalties: Vec<PenaltyDefinition>,
    /// Store settings.
    pub ledger: LedgerConfig,
    /// Deployment policy switches.
    pub policy: PolicyConfig,
    /// HTTP adapter settings.
    pub gateway: GatewayConfig,
}

/// One allowlisted household member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberConfig {
    /// Stable handle (e.g. `@alice`).
    pub identity: String,
    /// Display name.
    pub name: String,
    /// May run administrative operations such as a full reset.
    #[serde(default)]
    pub admin: bool,
    /// Accepted as confirmer even when away or when they reported the penalty.
    ///
    /// Never overrides the rule that an actor cannot confirm their own record.
    #[serde(default)]
    pub can_always_confirm: bool,
}

impl MemberConfig {
    /// Plain member with no extra capabilities.
    pub fn new(identity: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            name: name.into(),
            admin: false,
            can_always_confirm: false,
        }
    }
}

/// A chore that rotates between members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub name: String,
    pub points: i64,
    /// What doing the task involves.
    #[serde(default)]
    pub description: String,
}

impl TaskDefinition {
    fn new(name: &str, points: i64, description: &str) -> Self {
        Self {
            name: name.to_owned(),
            points,
            description: description.to_owned(),
        }
    }
}

/// A violation that can be reported against a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyDefinition {
    /// Short key used by adapters (`mess`, `missed_task`, ...).
    pub key: String,
    /// Human label stored on the record.
    pub label: String,
    /// Negative point value.
    pub points: i64,
}

impl PenaltyDefinition {
    fn new(key: &str, label: &str, points: i64) -> Self {
        Self {
            key: key.to_owned(),
            label: label.to_owned(),
            points,
        }
    }
}

/// Task name of the shared-cooking chore.
pub const COOKING_TASK: &str = "cooking";
/// Task name of the dishes chore.
pub const DISHES_TASK: &str = "dishes";

/// Default task catalogue.
pub fn default_tasks() -> Vec<TaskDefinition> {
    vec![
        TaskDefinition::new("toilet", 4, "Scrub the toilet; mop the toilet floor"),
        TaskDefinition::new(
            "bathroom",
            3,
            "Clean the bath/shower and sink; wipe the washing machine",
        ),
        TaskDefinition::new(
            "kitchen",
            3,
            "Vacuum the kitchen floor; wipe the table, counter by the sink and stove",
        ),
        TaskDefinition::new(
            "hallway",
            2,
            "Shake out the rugs; tidy the shoe shelf and the area by the door",
        ),
        TaskDefinition::new("vacuum", 2, "Vacuum the whole flat; put the vacuum away"),
        TaskDefinition::new("trash", 1, "Take out every trash bag; replace the bin liners"),
        TaskDefinition::new(
            COOKING_TASK,
            3,
            "Cook a meal for everyone; clean up after cooking (except dishes)",
        ),
        TaskDefinition::new(
            DISHES_TASK,
            2,
            "Wash the dishes after a shared meal; wipe the table; clean the stove if needed",
        ),
    ]
}

/// Default penalty catalogue.
pub fn default_penalties() -> Vec<PenaltyDefinition> {
    vec![
        PenaltyDefinition::new("mess", "left a mess", -1),
        PenaltyDefinition::new("missed_task", "skipped an assigned task", -2),
        PenaltyDefinition::new("litter", "left trash out", -1),
    ]
}

/// Store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Database file (None = `fairflat_dirs::data_dir()/fairflat.db`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
    /// Balance floor; balances never drop below this value.
    pub min_balance: i64,
    /// How long a writer waits for a competing writer's lock.
    pub busy_timeout_ms: u64,
    /// Default number of records returned by history views.
    pub history_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            min_balance: -10,
            busy_timeout_ms: 5_000,
            history_limit: 20,
        }
    }
}

impl LedgerConfig {
    /// Resolved database path.
    #[must_use]
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| crate::fairflat_dirs::data_dir().join("fairflat.db"))
    }
}

/// What an administrative reset clears.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetScope {
    /// Balances, queue pointers and all action records.
    #[default]
    Full,
    /// Balances and queue pointers; action history (and rotation recency) kept.
    BalancesOnly,
}

/// Who the confirmation workflow accepts as confirmer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmerScope {
    /// Any member other than the actor (and the reporter, for penalties).
    #[default]
    Anyone,
    /// As `Anyone`, and the confirmer must currently be home.
    HomeOnly,
}

/// Deployment policy switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub reset_scope: ResetScope,
    pub confirmer_scope: ConfirmerScope,
}

/// HTTP adapter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Required `Authorization: Bearer` token for mutating routes (None = open).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 4090,
            bearer_token: None,
        }
    }
}

impl FairflatConfig {
    /// Config with the default task and penalty catalogues and the given members.
    #[must_use]
    pub fn with_members(members: Vec<MemberConfig>) -> Self {
        Self {
            members,
            tasks: default_tasks(),
            penalties: default_penalties(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// Empty task or penalty tables are replaced by the default catalogues.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self =
            toml::from_str(&content).map_err(|e| FairflatError::Config(e.to_string()))?;
        if config.tasks.is_empty() {
            config.tasks = default_tasks();
        }
        if config.penalties.is_empty() {
            config.penalties = default_penalties();
        }
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| FairflatError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `fairflat_dirs::config_dir()/config.toml`.
    pub fn default_config_path() -> PathBuf {
        crate::fairflat_dirs::config_dir().join("config.toml")
    }

    /// Reject configurations the ledger cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `FairflatError::Config` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.members.is_empty() {
            return Err(FairflatError::Config("no members configured".to_owned()));
        }
        let mut identities = HashSet::new();
        for member in &self.members {
            if member.identity.trim().is_empty() {
                return Err(FairflatError::Config("member identity is empty".to_owned()));
            }
            if !identities.insert(member.identity.as_str()) {
                return Err(FairflatError::Config(format!(
                    "duplicate member identity {}",
                    member.identity
                )));
            }
        }

        let mut task_names = HashSet::new();
        for task in &self.tasks {
            if !task_names.insert(task.name.as_str()) {
                return Err(FairflatError::Config(format!(
                    "duplicate task `{}`",
                    task.name
                )));
            }
            if task.points < 0 {
                return Err(FairflatError::Config(format!(
                    "task `{}` has negative points",
                    task.name
                )));
            }
        }

        let mut penalty_keys = HashSet::new();
        for penalty in &self.penalties {
            if !penalty_keys.insert(penalty.key.as_str()) {
                return Err(FairflatError::Config(format!(
                    "duplicate penalty `{}`",
                    penalty.key
                )));
            }
            if penalty.points >= 0 {
                return Err(FairflatError::Config(format!(
                    "penalty `{}` must have negative points",
                    penalty.key
                )));
            }
        }

        if self.ledger.min_balance > 0 {
            return Err(FairflatError::Config(
                "ledger.min_balance must not be positive".to_owned(),
            ));
        }
        Ok(())
    }

    /// Look up a task by name.
    #[must_use]
    pub fn task(&self, name: &str) -> Option<&TaskDefinition> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Look up a penalty by key.
    #[must_use]
    pub fn penalty(&self, key: &str) -> Option<&PenaltyDefinition> {
        self.penalties.iter().find(|p| p.key == key)
    }
}
