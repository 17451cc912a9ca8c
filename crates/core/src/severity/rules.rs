//! Fixed clinical tables used by the severity scorer.
//!
//! Both tables are process-wide and read-only. Observation rules are keyed by LOINC code,
//! condition classes by ICD-10 code.

use api_shared::SeverityLevel;

/// Which side of the thresholds is abnormal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Values at or above the thresholds are abnormal.
    HighIsBad,
    /// Values at or below the thresholds are abnormal.
    LowIsBad,
}

/// Escalation thresholds for one lab or vital sign.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThresholdRule {
    pub code: &'static str,
    pub label: &'static str,
    /// Crossing this escalates to orange.
    pub high: f64,
    /// Crossing this escalates to red.
    pub critical: f64,
    pub direction: Direction,
}

impl ThresholdRule {
    /// Level a single reading maps to, or `None` when it is within range.
    ///
    /// Thresholds are inclusive.
    pub fn classify(&self, value: f64) -> Option<SeverityLevel> {
        let crosses = |threshold: f64| match self.direction {
            Direction::HighIsBad => value >= threshold,
            Direction::LowIsBad => value <= threshold,
        };

        if crosses(self.critical) {
            Some(SeverityLevel::Red)
        } else if crosses(self.high) {
            Some(SeverityLevel::Orange)
        } else {
            None
        }
    }

    /// Reason text for a reading classified at `level`.
    pub fn reason(&self, level: SeverityLevel, value: f64) -> String {
        let value = format_value(value);
        match (self.direction, level) {
            (Direction::HighIsBad, SeverityLevel::Red) => {
                format!("{} critically high ({value})", self.label)
            }
            (Direction::HighIsBad, _) => format!("{} elevated ({value})", self.label),
            (Direction::LowIsBad, SeverityLevel::Red) => {
                format!("{} critically low ({value})", self.label)
            }
            (Direction::LowIsBad, _) => format!("{} low ({value})", self.label),
        }
    }
}

pub const THRESHOLD_RULES: &[ThresholdRule] = &[
    ThresholdRule {
        code: "2160-0",
        label: "Creatinine",
        high: 1.3,
        critical: 2.0,
        direction: Direction::HighIsBad,
    },
    ThresholdRule {
        code: "2823-3",
        label: "Potassium",
        high: 5.0,
        critical: 6.0,
        direction: Direction::HighIsBad,
    },
    ThresholdRule {
        code: "3094-0",
        label: "BUN",
        high: 25.0,
        critical: 50.0,
        direction: Direction::HighIsBad,
    },
    ThresholdRule {
        code: "4548-4",
        label: "HbA1c",
        high: 8.0,
        critical: 10.0,
        direction: Direction::HighIsBad,
    },
    ThresholdRule {
        code: "2345-7",
        label: "Glucose",
        high: 180.0,
        critical: 300.0,
        direction: Direction::HighIsBad,
    },
    ThresholdRule {
        code: "33762-6",
        label: "NT-proBNP",
        high: 900.0,
        critical: 2000.0,
        direction: Direction::HighIsBad,
    },
    ThresholdRule {
        code: "33914-3",
        label: "eGFR",
        high: 30.0,
        critical: 15.0,
        direction: Direction::LowIsBad,
    },
    ThresholdRule {
        code: "10230-1",
        label: "LVEF",
        high: 40.0,
        critical: 30.0,
        direction: Direction::LowIsBad,
    },
    ThresholdRule {
        code: "59408-5",
        label: "SpO2",
        high: 92.0,
        critical: 88.0,
        direction: Direction::LowIsBad,
    },
    ThresholdRule {
        code: "19926-5",
        label: "FEV1 % predicted",
        high: 50.0,
        critical: 30.0,
        direction: Direction::LowIsBad,
    },
];

pub fn threshold_rule(code: &str) -> Option<&'static ThresholdRule> {
    THRESHOLD_RULES.iter().find(|r| r.code == code)
}

/// Diagnoses that force red.
pub const CRITICAL_CONDITION_CODES: &[&str] = &["N18.4", "N18.5", "N18.6", "I50.9", "J44.1"];

/// Chronic diagnoses that raise a green patient to orange.
pub const MODERATE_CONDITION_CODES: &[&str] = &["E11.9", "E11.40", "N18.3", "I10", "E78.5", "J45.50"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionClass {
    Critical,
    Moderate,
}

pub fn condition_class(code: &str) -> Option<ConditionClass> {
    if CRITICAL_CONDITION_CODES.contains(&code) {
        Some(ConditionClass::Critical)
    } else if MODERATE_CONDITION_CODES.contains(&code) {
        Some(ConditionClass::Moderate)
    } else {
        None
    }
}

/// Render a reading rounded to two decimals in its shortest form (`2.2`, `28`).
pub fn format_value(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded}")
}
