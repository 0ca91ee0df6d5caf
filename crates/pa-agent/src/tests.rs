//! Unit tests for pa-agent.

#[cfg(test)]
mod support {
    use chrono::{Duration, TimeZone, Utc};
    use pa_core::PatientTime;

    pub fn t(day: i64) -> PatientTime {
        Utc.with_ymd_and_hms(2021, 1, 1, 9, 0, 0).unwrap() + Duration::days(day)
    }
}

#[cfg(test)]
mod clinical {
    use super::support::t;
    use crate::{ClinicalEvent, ClinicalRow, ClinicalTable, ResourceKind, TableKind};

    #[test]
    fn routing() {
        assert_eq!(ResourceKind::Condition.table(), Some(TableKind::Conditions));
        assert_eq!(ResourceKind::MedicationRequest.table(), Some(TableKind::Medications));
        assert_eq!(ResourceKind::Appointment.table(), Some(TableKind::Actions));
        assert_eq!(ResourceKind::ServiceRequest.table(), Some(TableKind::Actions));
        assert_eq!(ResourceKind::Observation.table(), None);
    }

    #[test]
    fn merge_appends_and_counts_by_name() {
        let mut table = ClinicalTable::new(TableKind::Conditions);
        table.merge(&ClinicalEvent::new(ResourceKind::Condition, "fever", t(0)), 0);
        table.merge(&ClinicalEvent::new(ResourceKind::Condition, "cough", t(1)), 1);
        table.merge(&ClinicalEvent::new(ResourceKind::Condition, "fever", t(2)), 2);

        assert_eq!(table.len(), 3);
        assert_eq!(table.get("fever", t(0)).unwrap().count, 1);
        assert_eq!(table.get("fever", t(2)).unwrap().count, 2);
        assert_eq!(table.get("fever", t(2)).unwrap().record_index, Some(2));
        assert_eq!(table.active().count(), 3);
    }

    #[test]
    fn merge_same_key_updates_row() {
        let mut table = ClinicalTable::new(TableKind::Conditions);
        table.merge(&ClinicalEvent::new(ResourceKind::Condition, "fever", t(0)), 0);
        table.merge(
            &ClinicalEvent::new(ResourceKind::Condition, "fever", t(0)).end(t(3)).code("386661006"),
            4,
        );

        assert_eq!(table.len(), 1);
        let row = table.get("fever", t(0)).unwrap();
        assert!(!row.active);
        assert_eq!(row.end, Some(t(3)));
        assert_eq!(row.code.as_deref(), Some("386661006"));
        assert_eq!(row.record_index, Some(0));
    }

    #[test]
    fn name_lookup_tracks_merges() {
        let mut table = ClinicalTable::from_baseline(
            TableKind::Conditions,
            vec![ClinicalRow::new("asthma", t(0))],
        )
        .unwrap();
        assert!(table.contains_name("asthma"));
        assert!(!table.contains_name("fever"));

        table.merge(&ClinicalEvent::new(ResourceKind::Condition, "fever", t(1)), 0);
        table.merge(&ClinicalEvent::new(ResourceKind::Condition, "fever", t(1)).end(t(4)), 1);
        table.merge(&ClinicalEvent::new(ResourceKind::Condition, "asthma", t(2)), 2);
        assert!(table.contains_name("fever"));
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("asthma", t(2)).unwrap().count, 2);
        assert_eq!(table.get("fever", t(1)).unwrap().end, Some(t(4)));
    }

    #[test]
    fn baseline_duplicate_rejected() {
        let rows = vec![ClinicalRow::new("asthma", t(0)), ClinicalRow::new("asthma", t(0))];
        assert!(ClinicalTable::from_baseline(TableKind::Conditions, rows).is_err());
    }

    #[test]
    fn baseline_rows_renumbered() {
        let rows = vec![
            ClinicalRow::new("asthma", t(0)),
            ClinicalRow::new("asthma", t(5)).end(t(6)),
        ];
        let table = ClinicalTable::from_baseline(TableKind::Conditions, rows).unwrap();
        assert_eq!(table.get("asthma", t(5)).unwrap().count, 2);
        assert_eq!(table.active().count(), 1);
    }
}

#[cfg(test)]
mod patient {
    use super::support::t;
    use crate::{
        AgentError, ClinicalEvent, ClinicalRow, Gender, PatientBuilder, PatientRecordEntry,
        ResourceKind,
    };
    use pa_core::{EnvironmentId, PatientId};

    #[test]
    fn defaults() {
        let p = PatientBuilder::new(PatientId(12)).start_time(t(0)).build().unwrap();
        assert_eq!(p.name(), "12");
        assert_eq!(p.demographics.gender, Gender::Unknown);
        assert!(p.alive());
        assert!(p.record().is_empty());
        assert_eq!(p.last_time(), None);
    }

    #[test]
    fn push_assigns_index_and_merges() {
        let mut p = PatientBuilder::new(PatientId(0)).start_time(t(0)).build().unwrap();
        let entry = PatientRecordEntry::new(t(1), EnvironmentId(0))
            .interaction("diagnose_fever")
            .event(ClinicalEvent::new(ResourceKind::Condition, "fever", t(1)));
        let idx = p.push_entry(entry);

        assert_eq!(idx, 0);
        assert_eq!(p.record()[0].record_index, 0);
        assert!(p.conditions().contains_name("fever"));
        assert!(p.has_interaction("diagnose_fever"));
        assert!(!p.has_interaction("measure_bmi"));
    }

    #[test]
    fn death_marks_patient() {
        let mut p = PatientBuilder::new(PatientId(0)).start_time(t(0)).build().unwrap();
        p.push_entry(PatientRecordEntry::new(t(2), EnvironmentId(0)).interaction("death").death());
        assert!(!p.alive());
        assert_eq!(p.deceased_at(), Some(t(2)));
    }

    #[test]
    fn duplicate_lookup_uses_full_key() {
        let mut p = PatientBuilder::new(PatientId(0)).start_time(t(0)).build().unwrap();
        let entry = PatientRecordEntry::new(t(1), EnvironmentId(0)).interaction("a");
        p.push_entry(entry.clone());

        assert_eq!(p.find_duplicate(&entry.key()), Some(0));
        let other_env = PatientRecordEntry::new(t(1), EnvironmentId(1)).interaction("a");
        assert_eq!(p.find_duplicate(&other_env.key()), None);
        let other_ix = PatientRecordEntry::new(t(1), EnvironmentId(0)).interaction("b");
        assert_eq!(p.find_duplicate(&other_ix.key()), None);
    }

    #[test]
    fn time_order_check() {
        let p = PatientBuilder::new(PatientId(0)).start_time(t(0)).build().unwrap();
        assert!(p.check_time_order(Some(t(2)), t(2)).is_ok());
        assert!(p.check_time_order(None, t(0)).is_ok());
        assert!(matches!(
            p.check_time_order(Some(t(2)), t(1)),
            Err(AgentError::NonMonotonicTime { .. })
        ));
    }

    #[test]
    fn replace_rebuilds_tables_and_alive() {
        let mut p = PatientBuilder::new(PatientId(0))
            .start_time(t(0))
            .condition(ClinicalRow::new("asthma", t(0)))
            .build()
            .unwrap();
        let first = PatientRecordEntry::new(t(1), EnvironmentId(0))
            .interaction("x")
            .event(ClinicalEvent::new(ResourceKind::Condition, "fever", t(1)))
            .death();
        p.push_entry(first);
        assert!(!p.alive());

        let replacement = PatientRecordEntry::new(t(1), EnvironmentId(0))
            .interaction("x")
            .event(ClinicalEvent::new(ResourceKind::Condition, "cough", t(1)));
        p.replace_entry(0, replacement);

        assert_eq!(p.record().len(), 1);
        assert_eq!(p.record()[0].record_index, 0);
        assert!(p.alive());
        assert_eq!(p.deceased_at(), None);
        assert!(p.conditions().contains_name("asthma"));
        assert!(p.conditions().contains_name("cough"));
        assert!(!p.conditions().contains_name("fever"));
    }

    #[test]
    fn replace_updates_interaction_index() {
        let mut p = PatientBuilder::new(PatientId(0)).start_time(t(0)).build().unwrap();
        p.push_entry(PatientRecordEntry::new(t(1), EnvironmentId(0)).interaction("triage").interaction("x"));
        p.push_entry(PatientRecordEntry::new(t(2), EnvironmentId(0)).interaction("x"));
        assert!(p.has_interaction("triage"));

        p.replace_entry(0, PatientRecordEntry::new(t(1), EnvironmentId(0)).interaction("review"));
        assert!(!p.has_interaction("triage"));
        assert!(p.has_interaction("review"));
        // Still listed by the second entry.
        assert!(p.has_interaction("x"));

        p.replace_entry(1, PatientRecordEntry::new(t(2), EnvironmentId(0)).interaction("review"));
        assert!(!p.has_interaction("x"));
        assert!(p.has_interaction("review"));
    }

    #[test]
    fn history_must_be_environment_less() {
        let err = PatientBuilder::new(PatientId(0))
            .start_time(t(0))
            .history(PatientRecordEntry::new(t(-10), EnvironmentId(0)))
            .build()
            .unwrap_err();
        assert!(matches!(err, AgentError::HistoryInEnvironment { .. }));
    }

    #[test]
    fn history_validated_for_order_and_duplicates() {
        let out_of_order = PatientBuilder::new(PatientId(0))
            .start_time(t(0))
            .history(PatientRecordEntry::history(t(-1)).interaction("a"))
            .history(PatientRecordEntry::history(t(-5)).interaction("b"))
            .build();
        assert!(matches!(out_of_order, Err(AgentError::NonMonotonicTime { .. })));

        let duplicated = PatientBuilder::new(PatientId(0))
            .start_time(t(0))
            .history(PatientRecordEntry::history(t(-1)).interaction("a"))
            .history(PatientRecordEntry::history(t(-1)).interaction("a"))
            .build();
        assert!(matches!(duplicated, Err(AgentError::DuplicateRecordEntry { .. })));
    }

    #[test]
    fn history_effects_reach_tables() {
        let p = PatientBuilder::new(PatientId(0))
            .start_time(t(0))
            .history(
                PatientRecordEntry::history(t(-30))
                    .event(ClinicalEvent::new(ResourceKind::MedicationRequest, "salbutamol", t(-30))),
            )
            .build()
            .unwrap();
        assert_eq!(p.record().len(), 1);
        assert_eq!(p.record()[0].step, None);
        assert!(p.medications().contains_name("salbutamol"));
    }

    #[test]
    fn gender_parse() {
        assert_eq!("Female".parse::<Gender>().unwrap(), Gender::Female);
        assert!("robot".parse::<Gender>().is_err());
    }
}

#[cfg(test)]
mod environment {
    use super::support::t;
    use crate::{
        AgentError, DEATH_INTERACTION, Environment, EnvironmentSet, PatientDocument,
        PatientRecordEntry, Visit,
    };
    use pa_core::{EnvironmentId, PatientId};

    fn gp() -> Environment {
        Environment::new(EnvironmentId(0), "GP")
            .with_kind("gp")
            .with_interactions(["measure_bmi", "diagnose_fever"])
    }

    #[test]
    fn death_always_declared() {
        let env = Environment::new(EnvironmentId(3), "bare");
        assert!(env.declares(DEATH_INTERACTION));
        assert_eq!(env.interactions().collect::<Vec<_>>(), vec!["death"]);
    }

    #[test]
    fn interactions_sorted() {
        let env = gp();
        let names: Vec<_> = env.interactions().collect();
        assert_eq!(names, vec!["death", "diagnose_fever", "measure_bmi"]);
    }

    #[test]
    fn visits_recorded_and_replaced() {
        let mut env = gp();
        let mut entry = PatientRecordEntry::new(t(0), env.environment_id).interaction("measure_bmi");
        entry.record_index = 4;
        env.record_visit(PatientId(1), Visit::from_entry(&entry));
        assert_eq!(env.history_for(PatientId(1)).len(), 1);
        assert!(env.history_for(PatientId(1))[0].matches(&entry));
        assert!(env.history_for(PatientId(2)).is_empty());

        let mut replacement = PatientRecordEntry::new(t(0), env.environment_id).interaction("measure_bmi");
        replacement.record_index = 4;
        assert!(env.replace_visit(PatientId(1), Visit::from_entry(&replacement)));
        assert_eq!(env.history_for(PatientId(1))[0].entry_id, replacement.entry_id);

        replacement.record_index = 9;
        assert!(!env.replace_visit(PatientId(1), Visit::from_entry(&replacement)));
    }

    #[test]
    fn documents_attached_per_patient() {
        let mut env = gp();
        env.attach_documents(PatientId(1), vec![PatientDocument::text("letter", "Dear GP", t(0))]);
        env.attach_documents(PatientId(2), Vec::new());
        assert_eq!(env.documents_for(PatientId(1)).len(), 1);
        assert!(env.documents_for(PatientId(2)).is_empty());
    }

    #[test]
    fn set_rejects_duplicate_ids() {
        let err = EnvironmentSet::from_environments([gp(), gp()]).unwrap_err();
        assert!(matches!(err, AgentError::DuplicateEnvironment(EnvironmentId(0))));
    }

    #[test]
    fn set_rejects_sentinel_id() {
        let ghost = Environment::new(EnvironmentId::NONE, "Ghost");
        let err = EnvironmentSet::from_environments([gp(), ghost]).unwrap_err();
        assert!(matches!(err, AgentError::SentinelEnvironmentId(id) if id == EnvironmentId::NONE));

        let mut set = EnvironmentSet::new();
        assert!(set.insert(Environment::new(EnvironmentId::NONE, "Ghost")).is_err());
        assert!(set.is_empty());
    }

    #[test]
    fn set_lookup() {
        let set = EnvironmentSet::from_environments([
            gp(),
            Environment::new(EnvironmentId(1), "Lab").with_kind("lab"),
        ])
        .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.by_name("Lab").map(|e| e.environment_id), Some(EnvironmentId(1)));
        assert!(set.by_name("lab").is_none());
        assert!(set.require(EnvironmentId(7)).is_err());
    }

    #[test]
    fn clone_is_deep() {
        let pristine = EnvironmentSet::from_environments([gp()]).unwrap();
        let mut copy = pristine.clone();
        let entry = PatientRecordEntry::new(t(0), EnvironmentId(0)).interaction("measure_bmi");
        copy.get_mut(EnvironmentId(0))
            .unwrap()
            .record_visit(PatientId(0), Visit::from_entry(&entry));

        assert_eq!(copy.get(EnvironmentId(0)).unwrap().history_for(PatientId(0)).len(), 1);
        assert!(pristine.get(EnvironmentId(0)).unwrap().history_for(PatientId(0)).is_empty());
    }
}
