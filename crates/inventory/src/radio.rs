use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Radio lifecycle state.
///
/// `CheckedIn <-> CheckedOut` through checkout/return; `Locked` is entered and
/// left only through the administrative lock/unlock commands.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RadioStatus {
    CheckedIn,
    CheckedOut,
    Locked,
}

/// Direction of a checkout/return record or accessory loan entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    CheckedIn,
    CheckedOut,
}

impl From<LoanStatus> for RadioStatus {
    fn from(value: LoanStatus) -> Self {
        match value {
            LoanStatus::CheckedIn => RadioStatus::CheckedIn,
            LoanStatus::CheckedOut => RadioStatus::CheckedOut,
        }
    }
}

/// One checkout or return of a radio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRecord {
    pub status: LoanStatus,
    pub time: DateTime<Utc>,
    pub borrower: Option<String>,
    pub department: Option<String>,
    pub badge: Option<String>,
    /// Scanned barcode the borrower was resolved from, if any.
    #[serde(default)]
    pub barcode: Option<String>,
    /// Whether a headset went out bundled with this radio loan.
    pub headset: Option<bool>,
}

impl CheckoutRecord {
    /// The vacated state every radio starts in.
    pub fn blank() -> Self {
        Self {
            status: LoanStatus::CheckedIn,
            time: DateTime::<Utc>::UNIX_EPOCH,
            borrower: None,
            department: None,
            badge: None,
            barcode: None,
            headset: None,
        }
    }

    pub fn had_headset(&self) -> bool {
        self.headset == Some(true)
    }
}

/// A loanable radio.
///
/// `history` is append-only and never empty; `checkout` always equals its last
/// element. Both are only reachable through [`Radio::push_record`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RadioDocument")]
pub struct Radio {
    status: RadioStatus,
    last_activity: DateTime<Utc>,
    checkout: CheckoutRecord,
    history: Vec<CheckoutRecord>,
}

impl Radio {
    /// A freshly provisioned radio: checked in, one blank history entry.
    pub fn blank() -> Self {
        let record = CheckoutRecord::blank();
        Self {
            status: RadioStatus::CheckedIn,
            last_activity: record.time,
            checkout: record.clone(),
            history: vec![record],
        }
    }

    pub fn status(&self) -> RadioStatus {
        self.status
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Most recent checkout/return record.
    pub fn checkout(&self) -> &CheckoutRecord {
        &self.checkout
    }

    pub fn history(&self) -> &[CheckoutRecord] {
        &self.history
    }

    pub fn is_checked_out(&self) -> bool {
        self.status == RadioStatus::CheckedOut
    }

    /// Timestamp for the next transition, never earlier than the last one.
    pub fn next_stamp(&self, occurred_at: DateTime<Utc>) -> DateTime<Utc> {
        let floor = self
            .history
            .last()
            .map(|r| r.time)
            .unwrap_or(self.last_activity)
            .max(self.last_activity);
        occurred_at.max(floor)
    }

    pub(crate) fn push_record(&mut self, record: CheckoutRecord) {
        self.status = record.status.into();
        self.last_activity = record.time;
        self.checkout = record.clone();
        self.history.push(record);
    }

    pub(crate) fn set_locked(&mut self, locked: bool, at: DateTime<Utc>) {
        self.status = if locked {
            RadioStatus::Locked
        } else {
            RadioStatus::CheckedIn
        };
        self.last_activity = self.last_activity.max(at);
    }
}

/// Wire shape of a stored radio, validated before it becomes a [`Radio`].
#[derive(Deserialize)]
struct RadioDocument {
    status: RadioStatus,
    last_activity: DateTime<Utc>,
    #[serde(default)]
    checkout: Option<CheckoutRecord>,
    #[serde(default)]
    history: Vec<CheckoutRecord>,
}

impl TryFrom<RadioDocument> for Radio {
    type Error = String;

    fn try_from(doc: RadioDocument) -> Result<Self, Self::Error> {
        let Some(last) = doc.history.last() else {
            return Err("radio history must contain at least the initial entry".to_string());
        };
        if let Some(checkout) = &doc.checkout {
            if checkout != last {
                return Err("radio checkout record does not match the last history entry".to_string());
            }
        }
        if doc.history.windows(2).any(|w| w[1].time < w[0].time) {
            return Err("radio history is not in chronological order".to_string());
        }
        Ok(Self {
            status: doc.status,
            last_activity: doc.last_activity,
            checkout: last.clone(),
            history: doc.history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn out_record(secs: i64) -> CheckoutRecord {
        CheckoutRecord {
            status: LoanStatus::CheckedOut,
            time: at(secs),
            borrower: Some("Alice".to_string()),
            department: Some("TechOps".to_string()),
            badge: None,
            barcode: None,
            headset: Some(false),
        }
    }

    #[test]
    fn blank_radio_has_single_initial_entry() {
        let radio = Radio::blank();
        assert_eq!(radio.status(), RadioStatus::CheckedIn);
        assert_eq!(radio.history().len(), 1);
        assert_eq!(radio.checkout(), &radio.history()[0]);
    }

    #[test]
    fn push_record_keeps_checkout_equal_to_last_entry() {
        let mut radio = Radio::blank();
        radio.push_record(out_record(100));

        assert_eq!(radio.status(), RadioStatus::CheckedOut);
        assert_eq!(radio.last_activity(), at(100));
        assert_eq!(radio.history().len(), 2);
        assert_eq!(radio.checkout(), radio.history().last().unwrap());
    }

    #[test]
    fn next_stamp_never_goes_backwards() {
        let mut radio = Radio::blank();
        radio.push_record(out_record(500));
        assert_eq!(radio.next_stamp(at(400)), at(500));
        assert_eq!(radio.next_stamp(at(600)), at(600));
    }

    #[test]
    fn deserialization_rejects_mismatched_checkout() {
        let mut radio = Radio::blank();
        radio.push_record(out_record(100));
        let mut json = serde_json::to_value(&radio).unwrap();
        json["checkout"] = serde_json::to_value(CheckoutRecord::blank()).unwrap();

        assert!(serde_json::from_value::<Radio>(json).is_err());
    }

    #[test]
    fn deserialization_round_trips_valid_radio() {
        let mut radio = Radio::blank();
        radio.push_record(out_record(100));
        let json = serde_json::to_string(&radio).unwrap();
        let back: Radio = serde_json::from_str(&json).unwrap();
        assert_eq!(back, radio);
    }
}
