use crate::errors::AppError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A stored entity: field name to JSON value, checked against the schema of its kind.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Kpi,
    Project,
    Technology,
    Contract,
    Launch,
    Person,
    Milestone,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        Self::Kpi,
        Self::Project,
        Self::Technology,
        Self::Contract,
        Self::Launch,
        Self::Person,
        Self::Milestone,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kpi => "kpi",
            Self::Project => "project",
            Self::Technology => "technology",
            Self::Contract => "contract",
            Self::Launch => "launch",
            Self::Person => "person",
            Self::Milestone => "milestone",
        }
    }

    /// Key of the document collection holding entities of this kind.
    pub fn collection_name(self) -> &'static str {
        match self {
            Self::Kpi => "kpis",
            Self::Project => "projects",
            Self::Technology => "technologies",
            Self::Contract => "contracts",
            Self::Launch => "launches",
            Self::Person => "people",
            Self::Milestone => "milestones",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == raw || kind.collection_name() == raw)
            .ok_or_else(|| AppError::UnknownEntityType(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Create,
    Update,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: String,
    pub action: HistoryAction,
    pub entity_type: EntityKind,
    pub entity_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_data: Option<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_data: Option<Record>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapItem {
    pub id: String,
    pub title: String,
    pub year: i32,
    pub pillar: String,
    pub status: String,
    pub quarter: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    pub month: String,
    pub contracts: f64,
    pub grants: f64,
    pub services: f64,
}

impl MonthlyRevenue {
    pub fn total(&self) -> f64 {
        self.contracts + self.grants + self.services
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetLine {
    pub category: String,
    pub budget: f64,
    pub actual: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialData {
    #[serde(default)]
    pub revenue_by_month: Vec<MonthlyRevenue>,
    #[serde(default)]
    pub budget_vs_actual: Vec<BudgetLine>,
}

/// Seed content for a first-run document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedData {
    #[serde(default)]
    pub kpis: Vec<Record>,
    #[serde(default)]
    pub projects: Vec<Record>,
    #[serde(default)]
    pub technologies: Vec<Record>,
    #[serde(default)]
    pub contracts: Vec<Record>,
    #[serde(default)]
    pub launches: Vec<Record>,
    #[serde(default)]
    pub people: Vec<Record>,
    #[serde(default)]
    pub milestones: Vec<Record>,
    #[serde(default)]
    pub roadmap_items: Vec<RoadmapItem>,
    #[serde(default)]
    pub financial_data: FinancialData,
}

/// Root aggregate persisted under a single storage key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub kpis: Vec<Record>,
    #[serde(default)]
    pub projects: Vec<Record>,
    #[serde(default)]
    pub technologies: Vec<Record>,
    #[serde(default)]
    pub contracts: Vec<Record>,
    #[serde(default)]
    pub launches: Vec<Record>,
    #[serde(default)]
    pub people: Vec<Record>,
    #[serde(default)]
    pub milestones: Vec<Record>,
    #[serde(default)]
    pub roadmap_items: Vec<RoadmapItem>,
    #[serde(default)]
    pub financial_data: FinancialData,
    #[serde(default)]
    pub history: Vec<HistoryRecord>,
    pub last_updated: DateTime<Utc>,
}

impl Document {
    pub fn from_seed(seed: SeedData, now: DateTime<Utc>) -> Self {
        Self {
            kpis: seed.kpis,
            projects: seed.projects,
            technologies: seed.technologies,
            contracts: seed.contracts,
            launches: seed.launches,
            people: seed.people,
            milestones: seed.milestones,
            roadmap_items: seed.roadmap_items,
            financial_data: seed.financial_data,
            history: Vec::new(),
            last_updated: now,
        }
    }

    pub fn collection(&self, kind: EntityKind) -> &Vec<Record> {
        match kind {
            EntityKind::Kpi => &self.kpis,
            EntityKind::Project => &self.projects,
            EntityKind::Technology => &self.technologies,
            EntityKind::Contract => &self.contracts,
            EntityKind::Launch => &self.launches,
            EntityKind::Person => &self.people,
            EntityKind::Milestone => &self.milestones,
        }
    }

    pub fn collection_mut(&mut self, kind: EntityKind) -> &mut Vec<Record> {
        match kind {
            EntityKind::Kpi => &mut self.kpis,
            EntityKind::Project => &mut self.projects,
            EntityKind::Technology => &mut self.technologies,
            EntityKind::Contract => &mut self.contracts,
            EntityKind::Launch => &mut self.launches,
            EntityKind::Person => &mut self.people,
            EntityKind::Milestone => &mut self.milestones,
        }
    }
}

pub fn record_id(record: &Record) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

/// Records without an `archived` flag (seed data) count as active.
pub fn is_archived(record: &Record) -> bool {
    record.get("archived").and_then(Value::as_bool).unwrap_or(false)
}

/// Optional fields may hold an explicit `null`; typed views read it as the default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Date, flag and list fields are not type-checked on write, so a stored value
/// of another shape reads as the default instead of failing the whole view.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Outcome of a create/update call. Rejections are values, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Record>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl MutationResult {
    pub fn applied(item: Record) -> Self {
        Self {
            success: true,
            item: Some(item),
            errors: Vec::new(),
        }
    }

    pub fn rejected(errors: Vec<String>) -> Self {
        Self {
            success: false,
            item: None,
            errors,
        }
    }

    pub fn not_found() -> Self {
        Self::rejected(vec!["Item not found".to_string()])
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpi {
    pub id: String,
    pub name: String,
    pub category: String,
    pub department: String,
    pub value: f64,
    pub target: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unit: String,
    pub previous_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub trend: Vec<Value>,
    pub last_updated: String,
    pub updated_by: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub r#type: String,
    pub status: String,
    pub description: Option<String>,
    pub budget: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub spent: f64,
    pub owner: Option<String>,
    pub department: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub start_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub end_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub milestones: Vec<Value>,
    pub last_updated: String,
    #[serde(default, deserialize_with = "lenient")]
    pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Technology {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub trl_level: f64,
    pub target_trl: Option<f64>,
    pub status: String,
    pub roadmap_status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub blockers: Vec<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub dependencies: Vec<Value>,
    pub category: Option<String>,
    pub last_updated: String,
    #[serde(default, deserialize_with = "lenient")]
    pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: String,
    pub client: String,
    pub r#type: String,
    pub value: f64,
    #[serde(default, deserialize_with = "lenient")]
    pub start_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub end_date: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub contact_person: Option<String>,
    pub last_updated: String,
    #[serde(default, deserialize_with = "lenient")]
    pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Launch {
    pub id: String,
    pub name: String,
    pub platform: String,
    #[serde(default, deserialize_with = "lenient")]
    pub planned_date: String,
    #[serde(default, deserialize_with = "lenient")]
    pub executed_date: Option<String>,
    pub status: String,
    #[serde(default, deserialize_with = "lenient")]
    pub success: Option<bool>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub flight_hours: f64,
    pub payload: Option<String>,
    pub notes: Option<String>,
    pub last_updated: String,
    #[serde(default, deserialize_with = "lenient")]
    pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    pub name: String,
    pub department: String,
    pub role: String,
    #[serde(default, deserialize_with = "lenient")]
    pub start_date: Option<String>,
    pub status: String,
    pub email: Option<String>,
    pub last_updated: String,
    #[serde(default, deserialize_with = "lenient")]
    pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: String,
    pub name: String,
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub due_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub completed_date: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub last_updated: String,
    #[serde(default, deserialize_with = "lenient")]
    pub archived: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub active_projects: usize,
    pub completed_launches: usize,
    pub success_rate: u32,
    pub total_flight_hours: f64,
    pub active_contracts: usize,
    pub total_contract_value: f64,
    pub active_team: usize,
    pub open_positions: usize,
    pub completed_tech: usize,
    pub in_dev_tech: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiProgress {
    pub id: String,
    pub name: String,
    pub delta_percent: f64,
    pub progress_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Viewer,
    Editor,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }

    pub fn can_edit(self) -> bool {
        matches!(self, Self::Editor | Self::Admin)
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "viewer" => Ok(Self::Viewer),
            "editor" => Ok(Self::Editor),
            "admin" => Ok(Self::Admin),
            other => Err(AppError::InvalidInput(format!("unknown role: {}", other))),
        }
    }
}

/// Reporting period selected by the shell: a calendar year and quarter 1..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportingPeriod {
    pub year: i32,
    pub quarter: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub role: Role,
    pub period: ReportingPeriod,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            role: Role::Viewer,
            period: ReportingPeriod { year: 2026, quarter: 1 },
        }
    }
}
