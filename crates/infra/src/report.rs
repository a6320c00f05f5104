//! Point-in-time desk summary for the report binary.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};

use radiodesk_core::RadioId;
use radiodesk_inventory::{Inventory, RadioStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioOut {
    pub radio_id: RadioId,
    pub borrower: String,
    pub department: Option<String>,
    pub since: DateTime<Utc>,
    pub headset: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentUsage {
    pub department: String,
    pub outstanding: usize,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeskSummary {
    pub radios_out: Vec<RadioOut>,
    pub locked: Vec<RadioId>,
    pub headsets_available: i64,
    pub batteries_available: i64,
    /// Configured departments plus any department holding an accessory.
    pub departments: Vec<DepartmentUsage>,
}

impl DeskSummary {
    pub fn from_inventory(inventory: &Inventory) -> Self {
        let mut radios_out = Vec::new();
        let mut locked = Vec::new();
        for (radio_id, radio) in inventory.radios() {
            match radio.status() {
                RadioStatus::CheckedOut => {
                    let record = radio.checkout();
                    radios_out.push(RadioOut {
                        radio_id,
                        borrower: record.borrower.clone().unwrap_or_default(),
                        department: record.department.clone(),
                        since: record.time,
                        headset: record.had_headset(),
                    });
                }
                RadioStatus::Locked => locked.push(radio_id),
                RadioStatus::CheckedIn => {}
            }
        }

        let mut names: BTreeSet<&str> = inventory.limits().iter().map(|(name, _)| name).collect();
        for pool in [inventory.headsets(), inventory.batteries()] {
            names.extend(pool.outstanding().iter().filter_map(|l| l.department.as_deref()));
        }
        let departments = names
            .into_iter()
            .map(|name| DepartmentUsage {
                department: name.to_string(),
                outstanding: inventory.department_total(name),
                limit: inventory.limits().limit_for(name),
            })
            .collect();

        Self {
            radios_out,
            locked,
            headsets_available: inventory.headsets().available(),
            batteries_available: inventory.batteries().available(),
            departments,
        }
    }
}

impl fmt::Display for DeskSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Radios out: {}", self.radios_out.len())?;
        for out in &self.radios_out {
            write!(f, "  #{:<5} {}", out.radio_id, out.borrower)?;
            if let Some(dept) = &out.department {
                write!(f, " ({dept})")?;
            }
            if out.headset {
                f.write_str(" +headset")?;
            }
            writeln!(f, " since {}", out.since.format("%Y-%m-%d %H:%M"))?;
        }
        if !self.locked.is_empty() {
            let ids: Vec<String> = self.locked.iter().map(RadioId::to_string).collect();
            writeln!(f, "Locked: {}", ids.join(", "))?;
        }
        writeln!(f, "Headsets available: {}", self.headsets_available)?;
        writeln!(f, "Batteries available: {}", self.batteries_available)?;
        writeln!(f, "Departments:")?;
        for dept in &self.departments {
            match dept.limit {
                Some(limit) => writeln!(f, "  {:<16} {}/{limit}", dept.department, dept.outstanding)?,
                None => writeln!(f, "  {:<16} {}", dept.department, dept.outstanding)?,
            }
        }
        Ok(())
    }
}
