//! Traffic-light severity scoring.
//!
//! A patient's level starts at green and is only ever raised during a scoring pass:
//! observations are considered first (latest reading per thresholded code), then
//! conditions. Red is never downgraded, and orange-level findings are ignored once a
//! patient is red. At most three reasons are reported, in the order they were found.
//!
//! Scoring is total: unknown patients get a green default result, and readings with
//! missing codes or values are skipped.

pub mod rules;

use crate::index::ResourceIndex;
use api_shared::{SeverityLevel, SeverityResult};
use fhir::{initials, ConditionView, Gender, ObservationView, PatientView, ResourceType};
use rules::{condition_class, threshold_rule, ConditionClass, ThresholdRule};

/// Maximum number of reasons reported per patient.
pub const MAX_REASONS: usize = 3;

/// Score one patient from the index.
pub fn score(index: &ResourceIndex, patient_id: &str) -> SeverityResult {
    let patient = index
        .entries_of(patient_id, &ResourceType::Patient)
        .first()
        .map(|e| PatientView::from_resource(e.resource()));
    let observations: Vec<ObservationView> = index
        .entries_of(patient_id, &ResourceType::Observation)
        .into_iter()
        .map(|e| ObservationView::from_resource(e.resource()))
        .collect();
    let conditions: Vec<ConditionView> = index
        .entries_of(patient_id, &ResourceType::Condition)
        .into_iter()
        .map(|e| ConditionView::from_resource(e.resource()))
        .collect();

    let assessment = assess(&observations, &conditions);

    let name = patient.as_ref().map(PatientView::full_name).unwrap_or_default();
    let gender = patient.as_ref().map(|p| p.gender).unwrap_or(Gender::Unknown);

    SeverityResult {
        patient_id: patient_id.to_owned(),
        initials: initials(&name),
        name,
        gender: gender.as_str().to_owned(),
        severity: assessment.level,
        reasons: assessment.reasons,
    }
}

/// Score every indexed patient, in dataset order.
pub fn score_all(index: &ResourceIndex) -> Vec<SeverityResult> {
    index.records().map(|r| score(index, r.id())).collect()
}

/// Outcome of one scoring pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Assessment {
    pub level: SeverityLevel,
    pub reasons: Vec<String>,
}

impl Assessment {
    fn raise(&mut self, level: SeverityLevel, reason: String) {
        self.level = self.level.max(level);
        self.reasons.push(reason);
    }
}

/// Core scoring algorithm over already-extracted views.
///
/// Each condition contributes at most one reason: its first critical code if it has one,
/// else its first moderate code. Other codes on the same condition are not reported.
pub fn assess(observations: &[ObservationView], conditions: &[ConditionView]) -> Assessment {
    let mut assessment = Assessment::default();

    for (rule, value) in latest_readings(observations) {
        match rule.classify(value) {
            Some(SeverityLevel::Red) => {
                assessment.raise(SeverityLevel::Red, rule.reason(SeverityLevel::Red, value));
            }
            Some(SeverityLevel::Orange) if assessment.level != SeverityLevel::Red => {
                assessment.raise(SeverityLevel::Orange, rule.reason(SeverityLevel::Orange, value));
            }
            _ => {}
        }
    }

    for condition in conditions {
        if let Some(code) = first_code_of_class(condition, ConditionClass::Critical) {
            let reason = format!("Critical condition: {}", condition.display_or(code));
            assessment.raise(SeverityLevel::Red, reason);
        } else if let Some(code) = first_code_of_class(condition, ConditionClass::Moderate) {
            if assessment.level == SeverityLevel::Green {
                let reason = format!("Chronic condition: {}", condition.display_or(code));
                assessment.raise(SeverityLevel::Orange, reason);
            }
        }
    }

    assessment.reasons.truncate(MAX_REASONS);
    assessment
}

/// Latest value per thresholded code, in order of each code's first appearance.
///
/// "Latest" is the greatest effective timestamp by string comparison, which is valid for
/// zero-padded UTC ISO 8601 timestamps. Ties keep the reading seen first.
fn latest_readings(observations: &[ObservationView]) -> Vec<(&'static ThresholdRule, f64)> {
    let mut latest: Vec<(&'static ThresholdRule, &ObservationView, f64)> = Vec::new();

    for observation in observations {
        let Some(rule) = observation.code.as_deref().and_then(threshold_rule) else {
            continue;
        };
        let Some(value) = observation.value else {
            continue;
        };

        match latest.iter_mut().find(|(r, _, _)| r.code == rule.code) {
            Some(slot) => {
                if observation.effective_or_empty() > slot.1.effective_or_empty() {
                    *slot = (rule, observation, value);
                }
            }
            None => latest.push((rule, observation, value)),
        }
    }

    latest.into_iter().map(|(rule, _, value)| (rule, value)).collect()
}

fn first_code_of_class(condition: &ConditionView, class: ConditionClass) -> Option<&str> {
    condition
        .codes
        .iter()
        .map(String::as_str)
        .find(|code| condition_class(code) == Some(class))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhir::Dataset;
    use rules::{Direction, THRESHOLD_RULES};
    use serde_json::{json, Value};

    fn observation(code: &str, value: f64, effective: &str) -> Value {
        json!({
            "resourceType": "Observation",
            "code": {"coding": [{"system": "http://loinc.org", "code": code}]},
            "effectiveDateTime": effective,
            "valueQuantity": {"value": value}
        })
    }

    fn condition(code: &str, text: &str) -> Value {
        json!({
            "resourceType": "Condition",
            "code": {"coding": [{"code": code}], "text": text}
        })
    }

    fn index_with(resources: Vec<Value>) -> ResourceIndex {
        let mut entries = vec![json!({"resource": {
            "resourceType": "Patient",
            "id": "p1",
            "name": [{"family": "Morrison", "given": ["James"]}],
            "gender": "male"
        }})];
        entries.extend(resources.into_iter().map(|r| json!({"resource": r})));
        ResourceIndex::build(
            Dataset::from_value(json!({"patients": [{"entry": entries}]})).expect("dataset"),
        )
    }

    fn observation_views(resources: &[Value]) -> Vec<ObservationView> {
        resources.iter().map(ObservationView::from_resource).collect()
    }

    #[test]
    fn no_signals_is_green_without_reasons() {
        let result = score(&index_with(vec![]), "p1");
        assert_eq!(result.severity, SeverityLevel::Green);
        assert!(result.reasons.is_empty());
        assert_eq!(result.name, "James Morrison");
        assert_eq!(result.initials, "JM");
        assert_eq!(result.gender, "male");
    }

    #[test]
    fn critical_creatinine_is_red() {
        let index = index_with(vec![observation("2160-0", 2.2, "2026-01-01T00:00:00Z")]);
        let result = score(&index, "p1");
        assert_eq!(result.severity, SeverityLevel::Red);
        assert_eq!(result.reasons, vec!["Creatinine critically high (2.2)"]);
    }

    #[test]
    fn low_egfr_is_orange() {
        let index = index_with(vec![observation("33914-3", 28.0, "2026-01-01T00:00:00Z")]);
        let result = score(&index, "p1");
        assert_eq!(result.severity, SeverityLevel::Orange);
        assert!(result.reasons.contains(&"eGFR low (28)".to_string()));
    }

    #[test]
    fn every_rule_escalates_at_its_thresholds() {
        for rule in THRESHOLD_RULES {
            let below = match rule.direction {
                Direction::HighIsBad => rule.high - 1.0,
                Direction::LowIsBad => rule.high + 1.0,
            };
            for (value, expected) in [
                (rule.critical, SeverityLevel::Red),
                (rule.high, SeverityLevel::Orange),
                (below, SeverityLevel::Green),
            ] {
                let views = observation_views(&[observation(rule.code, value, "2026-01-01")]);
                let assessment = assess(&views, &[]);
                assert_eq!(assessment.level, expected, "{} at {value}", rule.code);
                assert_eq!(
                    assessment.reasons.is_empty(),
                    expected == SeverityLevel::Green,
                    "{} at {value}",
                    rule.code
                );
            }
        }
    }

    #[test]
    fn only_latest_reading_per_code_counts() {
        let views = observation_views(&[
            observation("2160-0", 2.6, "2026-01-01T00:00:00Z"),
            observation("2160-0", 0.9, "2026-03-01T00:00:00Z"),
            observation("2160-0", 2.4, "2026-02-01T00:00:00Z"),
        ]);
        let assessment = assess(&views, &[]);
        assert_eq!(assessment.level, SeverityLevel::Green);
        assert!(assessment.reasons.is_empty());
    }

    #[test]
    fn equal_timestamps_keep_first_reading() {
        let views = observation_views(&[
            observation("2160-0", 1.5, "2026-01-01T00:00:00Z"),
            observation("2160-0", 2.5, "2026-01-01T00:00:00Z"),
        ]);
        assert_eq!(assess(&views, &[]).reasons, vec!["Creatinine elevated (1.5)"]);
    }

    #[test]
    fn red_is_never_downgraded() {
        let views = observation_views(&[
            observation("2160-0", 2.5, "2026-01-01"),
            observation("2823-3", 5.2, "2026-01-01"),
        ]);
        let conditions = vec![ConditionView::from_resource(&condition(
            "E11.9",
            "Type 2 diabetes mellitus",
        ))];
        let assessment = assess(&views, &conditions);
        assert_eq!(assessment.level, SeverityLevel::Red);
        assert_eq!(assessment.reasons, vec!["Creatinine critically high (2.5)"]);
    }

    #[test]
    fn order_of_signals_does_not_matter_for_red() {
        let views = observation_views(&[
            observation("2823-3", 5.2, "2026-01-01"),
            observation("2160-0", 2.5, "2026-01-01"),
        ]);
        let assessment = assess(&views, &[]);
        assert_eq!(assessment.level, SeverityLevel::Red);
        assert_eq!(
            assessment.reasons,
            vec!["Potassium elevated (5.2)", "Creatinine critically high (2.5)"]
        );
    }

    #[test]
    fn every_critical_signal_adds_a_reason() {
        let views = observation_views(&[
            observation("2160-0", 2.5, "2026-01-01"),
            observation("2823-3", 6.1, "2026-01-01"),
        ]);
        let assessment = assess(&views, &[]);
        assert_eq!(assessment.reasons.len(), 2);
    }

    #[test]
    fn reasons_are_capped_at_three() {
        let views = observation_views(&[
            observation("2160-0", 2.5, "2026-01-01"),
            observation("2823-3", 6.1, "2026-01-01"),
            observation("3094-0", 60.0, "2026-01-01"),
            observation("33914-3", 12.0, "2026-01-01"),
        ]);
        let conditions = vec![ConditionView::from_resource(&condition("I50.9", "Heart failure"))];
        let assessment = assess(&views, &conditions);
        assert_eq!(assessment.reasons.len(), MAX_REASONS);
        assert_eq!(assessment.reasons[0], "Creatinine critically high (2.5)");
    }

    #[test]
    fn critical_condition_forces_red() {
        let views = observation_views(&[observation("2160-0", 1.5, "2026-01-01")]);
        let conditions = vec![ConditionView::from_resource(&condition(
            "N18.4",
            "Chronic kidney disease, stage 4",
        ))];
        let assessment = assess(&views, &conditions);
        assert_eq!(assessment.level, SeverityLevel::Red);
        assert_eq!(
            assessment.reasons,
            vec![
                "Creatinine elevated (1.5)",
                "Critical condition: Chronic kidney disease, stage 4"
            ]
        );
    }

    #[test]
    fn moderate_condition_only_raises_green() {
        let conditions = vec![
            ConditionView::from_resource(&condition("I10", "Essential hypertension")),
            ConditionView::from_resource(&condition("E11.9", "Type 2 diabetes mellitus")),
        ];
        let assessment = assess(&[], &conditions);
        assert_eq!(assessment.level, SeverityLevel::Orange);
        assert_eq!(assessment.reasons, vec!["Chronic condition: Essential hypertension"]);
    }

    #[test]
    fn condition_with_several_codes_gives_one_reason() {
        let resource = json!({
            "resourceType": "Condition",
            "code": {"coding": [{"code": "I10"}, {"code": "I50.9"}]}
        });
        let assessment = assess(&[], &[ConditionView::from_resource(&resource)]);
        assert_eq!(assessment.level, SeverityLevel::Red);
        assert_eq!(assessment.reasons, vec!["Critical condition: I50.9"]);
    }

    #[test]
    fn malformed_readings_are_skipped() {
        let views = observation_views(&[
            json!({"resourceType": "Observation", "valueQuantity": {"value": 9.9}}),
            json!({"code": {"coding": [{"code": "2160-0"}]}, "valueQuantity": {"value": "2.5"}}),
            json!({"code": {"coding": [{"code": "2160-0"}]}}),
            json!({"code": "2160-0", "valueQuantity": 2.5}),
        ]);
        let assessment = assess(&views, &[]);
        assert_eq!(assessment, Assessment::default());
    }

    #[test]
    fn unknown_patient_gets_default_result() {
        let result = score(&index_with(vec![]), "nobody");
        assert_eq!(result.patient_id, "nobody");
        assert_eq!(result.severity, SeverityLevel::Green);
        assert_eq!(result.name, "");
        assert_eq!(result.initials, "");
        assert_eq!(result.gender, "unknown");
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn score_all_follows_dataset_order() {
        let index = ResourceIndex::build(
            Dataset::from_value(json!({"patients": [
                {"entry": [{"resource": {"resourceType": "Patient", "id": "b"}}]},
                {"entry": [{"resource": {"resourceType": "Patient", "id": "a"}}]}
            ]}))
            .expect("dataset"),
        );
        let ids: Vec<_> = score_all(&index).into_iter().map(|r| r.patient_id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
