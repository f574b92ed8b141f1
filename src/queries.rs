//! Derived read views. Every call reloads the document through the store;
//! nothing here is cached.

use crate::errors::{AppError, AppResult};
use crate::models::{
    record_id, Contract, Document, EntityKind, FinancialData, Kpi, KpiProgress, Launch, Milestone, MonthlyRevenue,
    Person, Project, Record, ReportingPeriod, RoadmapItem, SummaryStats, Technology,
};
use crate::service::{active_records, DataService};
use crate::store::KeyValueStorage;
use crate::validation::is_date;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

impl<S: KeyValueStorage> DataService<S> {
    pub fn kpis_by_department(&self, department: &str) -> AppResult<Vec<Kpi>> {
        let kpis: Vec<Kpi> = self.typed_all(EntityKind::Kpi)?;
        Ok(kpis.into_iter().filter(|kpi| kpi.department == department).collect())
    }

    pub fn kpis_by_category(&self, category: &str) -> AppResult<Vec<Kpi>> {
        let kpis: Vec<Kpi> = self.typed_all(EntityKind::Kpi)?;
        Ok(kpis.into_iter().filter(|kpi| kpi.category == category).collect())
    }

    pub fn kpi_progress_by_department(&self, department: &str) -> AppResult<Vec<KpiProgress>> {
        Ok(self.kpis_by_department(department)?.iter().map(kpi_progress).collect())
    }

    pub fn active_projects(&self) -> AppResult<Vec<Project>> {
        let projects: Vec<Project> = self.typed_all(EntityKind::Project)?;
        Ok(projects.into_iter().filter(|project| project.status == "active").collect())
    }

    pub fn projects_by_type(&self, project_type: &str) -> AppResult<Vec<Project>> {
        let projects: Vec<Project> = self.typed_all(EntityKind::Project)?;
        Ok(projects.into_iter().filter(|project| project.r#type == project_type).collect())
    }

    /// Milestones whose `projectId` points at `project_id`.
    pub fn milestones_for_project(&self, project_id: &str) -> AppResult<Vec<Milestone>> {
        let milestones: Vec<Milestone> = self.typed_all(EntityKind::Milestone)?;
        Ok(milestones
            .into_iter()
            .filter(|milestone| milestone.project_id.as_deref() == Some(project_id))
            .collect())
    }

    pub fn upcoming_launches(&self) -> AppResult<Vec<Launch>> {
        let launches: Vec<Launch> = self.typed_all(EntityKind::Launch)?;
        Ok(upcoming(launches))
    }

    pub fn completed_launches(&self) -> AppResult<Vec<Launch>> {
        let launches: Vec<Launch> = self.typed_all(EntityKind::Launch)?;
        Ok(launches.into_iter().filter(|launch| launch.status == "completed").collect())
    }

    pub fn launches_in_period(&self, period: ReportingPeriod) -> AppResult<Vec<Launch>> {
        let launches: Vec<Launch> = self.typed_all(EntityKind::Launch)?;
        Ok(launches
            .into_iter()
            .filter(|launch| in_period(&launch.planned_date, period))
            .collect())
    }

    pub fn people_by_department(&self, department: &str) -> AppResult<Vec<Person>> {
        let people: Vec<Person> = self.typed_all(EntityKind::Person)?;
        Ok(people.into_iter().filter(|person| person.department == department).collect())
    }

    pub fn open_positions(&self) -> AppResult<Vec<Person>> {
        let people: Vec<Person> = self.typed_all(EntityKind::Person)?;
        Ok(people.into_iter().filter(|person| person.status == "open-position").collect())
    }

    pub fn active_contracts(&self) -> AppResult<Vec<Contract>> {
        let contracts: Vec<Contract> = self.typed_all(EntityKind::Contract)?;
        Ok(contracts.into_iter().filter(|contract| contract.status == "active").collect())
    }

    pub fn contracts_by_type(&self, contract_type: &str) -> AppResult<Vec<Contract>> {
        let contracts: Vec<Contract> = self.typed_all(EntityKind::Contract)?;
        Ok(contracts
            .into_iter()
            .filter(|contract| contract.r#type == contract_type)
            .collect())
    }

    pub fn technologies_by_status(&self, status: &str) -> AppResult<Vec<Technology>> {
        let technologies: Vec<Technology> = self.typed_all(EntityKind::Technology)?;
        Ok(technologies
            .into_iter()
            .filter(|technology| technology.status == status)
            .collect())
    }

    pub fn group_by_department(&self, kind: EntityKind) -> AppResult<BTreeMap<String, Vec<Record>>> {
        Ok(group_by(self.get_all(kind)?, "department"))
    }

    pub fn group_by_status(&self, kind: EntityKind) -> AppResult<BTreeMap<String, Vec<Record>>> {
        Ok(group_by(self.get_all(kind)?, "status"))
    }

    pub fn group_by_type(&self, kind: EntityKind) -> AppResult<BTreeMap<String, Vec<Record>>> {
        Ok(group_by(self.get_all(kind)?, "type"))
    }

    pub fn financial_data(&self) -> AppResult<FinancialData> {
        Ok(self.document()?.financial_data)
    }

    pub fn revenue_for_quarter(&self, quarter: u8) -> AppResult<Vec<MonthlyRevenue>> {
        Ok(revenue_for_quarter(&self.document()?.financial_data, quarter))
    }

    pub fn roadmap_items(&self) -> AppResult<Vec<RoadmapItem>> {
        Ok(self.document()?.roadmap_items)
    }

    pub fn roadmap_by_year(&self, year: i32) -> AppResult<Vec<RoadmapItem>> {
        Ok(self
            .document()?
            .roadmap_items
            .into_iter()
            .filter(|item| item.year == year)
            .collect())
    }

    pub fn summary_stats(&self) -> AppResult<SummaryStats> {
        summary_stats(&self.document()?)
    }

    fn typed_all<T: DeserializeOwned>(&self, kind: EntityKind) -> AppResult<Vec<T>> {
        typed(kind, active_records(&self.document()?, kind))
    }
}

/// Converts schema-checked records into the typed view of their kind.
pub fn typed<T: DeserializeOwned>(kind: EntityKind, records: Vec<Record>) -> AppResult<Vec<T>> {
    records
        .into_iter()
        .map(|record| {
            let id = record_id(&record).unwrap_or("?").to_string();
            serde_json::from_value(Value::Object(record))
                .map_err(|error| AppError::Internal(format!("{} {} has an unexpected shape: {}", kind, id, error)))
        })
        .collect()
}

/// Groups records by the string form of `field`; records without it are skipped.
pub fn group_by(records: Vec<Record>, field: &str) -> BTreeMap<String, Vec<Record>> {
    let mut groups: BTreeMap<String, Vec<Record>> = BTreeMap::new();
    for record in records {
        let key = match record.get(field) {
            None | Some(Value::Null) => continue,
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        };
        groups.entry(key).or_default().push(record);
    }
    groups
}

pub fn summary_stats(document: &Document) -> AppResult<SummaryStats> {
    let projects: Vec<Project> = typed(EntityKind::Project, active_records(document, EntityKind::Project))?;
    let launches: Vec<Launch> = typed(EntityKind::Launch, active_records(document, EntityKind::Launch))?;
    let contracts: Vec<Contract> = typed(EntityKind::Contract, active_records(document, EntityKind::Contract))?;
    let people: Vec<Person> = typed(EntityKind::Person, active_records(document, EntityKind::Person))?;
    let technologies: Vec<Technology> =
        typed(EntityKind::Technology, active_records(document, EntityKind::Technology))?;

    let completed: Vec<&Launch> = launches.iter().filter(|launch| launch.status == "completed").collect();
    let successful = completed.iter().filter(|launch| launch.success == Some(true)).count();
    let active_contracts: Vec<&Contract> = contracts.iter().filter(|contract| contract.status == "active").collect();

    Ok(SummaryStats {
        active_projects: projects.iter().filter(|project| project.status == "active").count(),
        completed_launches: completed.len(),
        success_rate: percentage(successful, completed.len()),
        total_flight_hours: launches.iter().map(|launch| launch.flight_hours).sum(),
        active_contracts: active_contracts.len(),
        total_contract_value: active_contracts.iter().map(|contract| contract.value).sum(),
        active_team: people.iter().filter(|person| person.status == "active").count(),
        open_positions: people.iter().filter(|person| person.status == "open-position").count(),
        completed_tech: technologies.iter().filter(|tech| tech.status == "completed").count(),
        in_dev_tech: technologies
            .iter()
            .filter(|tech| tech.status == "development" || tech.status == "testing")
            .count(),
    })
}

fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

/// Planned launches, earliest planned date first; unparseable dates sort last.
pub fn upcoming(launches: Vec<Launch>) -> Vec<Launch> {
    let mut planned: Vec<Launch> = launches.into_iter().filter(|launch| launch.status == "planned").collect();
    planned.sort_by_key(|launch| (parse_instant(&launch.planned_date).is_none(), parse_instant(&launch.planned_date)));
    planned
}

pub fn kpi_progress(kpi: &Kpi) -> KpiProgress {
    let delta_percent = match kpi.previous_value {
        Some(previous) if previous != 0.0 => (kpi.value - previous) / previous * 100.0,
        _ => 0.0,
    };
    let progress_percent = match kpi.target {
        Some(target) if target != 0.0 => (kpi.value / target * 100.0).min(100.0),
        _ => 0.0,
    };
    KpiProgress {
        id: kpi.id.clone(),
        name: kpi.name.clone(),
        delta_percent,
        progress_percent,
    }
}

/// Spent share of budget as a rounded percentage; 0 without a budget.
pub fn project_budget_progress(project: &Project) -> u32 {
    match project.budget {
        Some(budget) if budget > 0.0 => (project.spent / budget * 100.0).round().max(0.0) as u32,
        _ => 0,
    }
}

pub fn quarter_months(quarter: u8) -> &'static [&'static str] {
    match quarter {
        1..=4 => {
            let start = usize::from(quarter - 1) * 3;
            &MONTHS[start..start + 3]
        }
        _ => &[],
    }
}

pub fn revenue_for_quarter(financial: &FinancialData, quarter: u8) -> Vec<MonthlyRevenue> {
    let months = quarter_months(quarter);
    financial
        .revenue_by_month
        .iter()
        .filter(|entry| months.contains(&entry.month.as_str()))
        .cloned()
        .collect()
}

fn in_period(raw: &str, period: ReportingPeriod) -> bool {
    let Some(date) = parse_instant(raw).map(|instant| instant.date_naive()) else {
        return false;
    };
    let Some(quarter) = quarter_bounds(period) else {
        return false;
    };
    date >= quarter.0 && date <= quarter.1
}

fn quarter_bounds(period: ReportingPeriod) -> Option<(NaiveDate, NaiveDate)> {
    if !(1..=4).contains(&period.quarter) {
        return None;
    }
    let first_month = u32::from(period.quarter - 1) * 3 + 1;
    let start = NaiveDate::from_ymd_opt(period.year, first_month, 1)?;
    let next = if period.quarter == 4 {
        NaiveDate::from_ymd_opt(period.year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(period.year, first_month + 3, 1)?
    };
    Some((start, next.pred_opt()?))
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    if !is_date(raw) {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|instant| instant.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
}
