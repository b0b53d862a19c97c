// src/indicator_tests.rs

#[cfg(test)]
mod tests {
    use crate::fitness::*;
    use crate::indicators::*;
    use crate::roster_client::{AssignmentRecord, EmployeeRecord, ShiftRecord};
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    fn create_test_shift(
        shift_id: i64,
        date: &str,
        role: &str,
        start: &str,
        end: &str,
    ) -> ShiftRecord {
        ShiftRecord {
            shift_id,
            role: role.to_string(),
            date: d(date),
            start: start.to_string(),
            end: end.to_string(),
            expected_traffic: None,
            customer_count: None,
            sales_volume: None,
        }
    }

    fn create_test_employee(
        employee_id: i64,
        name: &str,
        skills: &[(&str, f64)],
    ) -> EmployeeRecord {
        EmployeeRecord {
            employee_id,
            first_name: name.to_string(),
            last_name: "Test".to_string(),
            primary_role: None,
            hours_worked_this_week: None,
            preferred_hours_per_week: None,
            skills: skills
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }

    fn create_test_assignment(id: &str, shift_id: i64, employee_id: i64) -> AssignmentRecord {
        AssignmentRecord {
            id: id.to_string(),
            shift_id,
            employee_id,
            role: "BARISTA".to_string(),
            fitness: None,
            is_manual: false,
            start_time: None,
            end_time: None,
        }
    }

    #[test]
    fn traffic_buckets_split_week_totals_into_tertiles() {
        // 60 / 120 / 180 shift-minutes across three days
        let shifts = vec![
            create_test_shift(1, "2025-08-04", "BARISTA", "09:00", "10:00"),
            create_test_shift(2, "2025-08-05", "BARISTA", "09:00", "11:00"),
            create_test_shift(3, "2025-08-06", "BARISTA", "09:00", "12:00"),
        ];
        let days = build_week_indicators(&shifts, &[], &[], &SkillWeightScorer);
        assert_eq!(days.get(&d("2025-08-04")).unwrap().traffic, Traffic::Low);
        assert_eq!(days.get(&d("2025-08-05")).unwrap().traffic, Traffic::Medium);
        assert_eq!(days.get(&d("2025-08-06")).unwrap().traffic, Traffic::High);
    }

    #[test]
    fn traffic_bucketing_is_stable_under_shift_reordering() {
        let mut shifts = vec![
            create_test_shift(1, "2025-08-04", "BARISTA", "09:00", "10:00"),
            create_test_shift(2, "2025-08-05", "BARISTA", "09:00", "11:00"),
            create_test_shift(3, "2025-08-05", "WAITER", "12:00", "13:00"),
            create_test_shift(4, "2025-08-06", "BARISTA", "09:00", "12:00"),
        ];
        let forward = build_week_indicators(&shifts, &[], &[], &SkillWeightScorer);
        shifts.reverse();
        let backward = build_week_indicators(&shifts, &[], &[], &SkillWeightScorer);
        assert_eq!(forward, backward);
    }

    #[test]
    fn equal_day_totals_bucket_everything_to_low() {
        let shifts = vec![
            create_test_shift(1, "2025-08-04", "BARISTA", "09:00", "11:00"),
            create_test_shift(2, "2025-08-05", "BARISTA", "12:00", "14:00"),
        ];
        let days = build_week_indicators(&shifts, &[], &[], &SkillWeightScorer);
        assert!(days.values().all(|i| i.traffic == Traffic::Low));
    }

    #[test]
    fn explicit_traffic_hint_wins_over_bucketing() {
        let mut hinted = create_test_shift(1, "2025-08-04", "BARISTA", "09:00", "10:00");
        hinted.expected_traffic = Some(Traffic::High);
        let shifts = vec![
            hinted,
            create_test_shift(2, "2025-08-05", "BARISTA", "09:00", "17:00"),
        ];
        let days = build_week_indicators(&shifts, &[], &[], &SkillWeightScorer);
        // Smallest day of the week, but the hint overrides the fallback.
        assert_eq!(days.get(&d("2025-08-04")).unwrap().traffic, Traffic::High);
    }

    #[test]
    fn barista_only_day_classifies_as_coffee_and_is_idempotent() {
        let shifts = vec![
            create_test_shift(1, "2025-08-04", "BARISTA", "09:00", "12:00"),
            create_test_shift(2, "2025-08-04", "BARISTA", "12:00", "15:00"),
        ];
        let first = build_week_indicators(&shifts, &[], &[], &SkillWeightScorer);
        let second = build_week_indicators(&shifts, &[], &[], &SkillWeightScorer);
        assert_eq!(first.get(&d("2025-08-04")).unwrap().demand, Demand::Coffee);
        assert_eq!(first, second);
    }

    #[test]
    fn sandwich_dominant_day_classifies_as_sandwich() {
        let shifts = vec![
            create_test_shift(1, "2025-08-04", "SANDWICH", "09:00", "14:00"),
            create_test_shift(2, "2025-08-04", "BARISTA", "09:00", "10:00"),
        ];
        let days = build_week_indicators(&shifts, &[], &[], &SkillWeightScorer);
        assert_eq!(days.get(&d("2025-08-04")).unwrap().demand, Demand::Sandwich);
    }

    #[test]
    fn tied_role_minutes_classify_as_mixed() {
        let shifts = vec![
            create_test_shift(1, "2025-08-04", "BARISTA", "09:00", "11:00"),
            create_test_shift(2, "2025-08-04", "SANDWICH", "11:00", "13:00"),
        ];
        let days = build_week_indicators(&shifts, &[], &[], &SkillWeightScorer);
        assert_eq!(days.get(&d("2025-08-04")).unwrap().demand, Demand::Mixed);
    }

    #[test]
    fn non_product_role_day_classifies_as_mixed() {
        let shifts = vec![create_test_shift(1, "2025-08-04", "MANAGER", "09:00", "17:00")];
        let days = build_week_indicators(&shifts, &[], &[], &SkillWeightScorer);
        assert_eq!(days.get(&d("2025-08-04")).unwrap().demand, Demand::Mixed);
    }

    #[test]
    fn one_shift_with_three_poor_fits_counts_one_mismatch() {
        let shifts = vec![create_test_shift(1, "2025-08-04", "BARISTA", "09:00", "17:00")];
        let employees = vec![
            create_test_employee(1, "A", &[]),
            create_test_employee(2, "B", &[]),
            create_test_employee(3, "C", &[]),
        ];
        let assignments = vec![
            create_test_assignment("a1", 1, 1),
            create_test_assignment("a2", 1, 2),
            create_test_assignment("a3", 1, 3),
        ];
        let days = build_week_indicators(&shifts, &assignments, &employees, &SkillWeightScorer);
        assert_eq!(days.get(&d("2025-08-04")).unwrap().mismatches, 1);
    }

    #[test]
    fn two_alert_shifts_on_one_day_count_two_mismatches() {
        let shifts = vec![
            create_test_shift(1, "2025-08-04", "BARISTA", "09:00", "12:00"),
            create_test_shift(2, "2025-08-04", "BARISTA", "12:00", "17:00"),
        ];
        let employees = vec![create_test_employee(1, "A", &[])];
        let assignments = vec![
            create_test_assignment("a1", 1, 1),
            create_test_assignment("a2", 2, 1),
        ];
        let days = build_week_indicators(&shifts, &assignments, &employees, &SkillWeightScorer);
        assert_eq!(days.get(&d("2025-08-04")).unwrap().mismatches, 2);
    }

    #[test]
    fn well_fitted_staff_produce_no_mismatch() {
        let shifts = vec![create_test_shift(1, "2025-08-04", "BARISTA", "09:00", "17:00")];
        let employees = vec![create_test_employee(
            1,
            "Pro",
            &[
                (SKILL_COFFEE, 95.0),
                (SKILL_CUSTOMER_SERVICE, 90.0),
                (SKILL_SPEED, 90.0),
            ],
        )];
        let assignments = vec![create_test_assignment("a1", 1, 1)];
        let days = build_week_indicators(&shifts, &assignments, &employees, &SkillWeightScorer);
        assert_eq!(days.get(&d("2025-08-04")).unwrap().mismatches, 0);
    }

    #[test]
    fn dangling_references_are_skipped_not_fatal() {
        let shifts = vec![create_test_shift(1, "2025-08-04", "BARISTA", "09:00", "17:00")];
        let assignments = vec![
            create_test_assignment("a1", 999, 1), // unknown shift
            create_test_assignment("a2", 1, 999), // unknown employee
        ];
        let days = build_week_indicators(&shifts, &assignments, &[], &SkillWeightScorer);
        assert_eq!(days.get(&d("2025-08-04")).unwrap().mismatches, 0);
    }

    #[test]
    fn days_without_shifts_are_omitted() {
        let shifts = vec![create_test_shift(1, "2025-08-04", "BARISTA", "09:00", "17:00")];
        let days = build_week_indicators(&shifts, &[], &[], &SkillWeightScorer);
        assert_eq!(days.len(), 1);
        assert!(days.contains_key(&d("2025-08-04")));
    }

    #[test]
    fn empty_inputs_produce_empty_output() {
        let days = build_week_indicators(&[], &[], &[], &SkillWeightScorer);
        assert!(days.is_empty());
    }

    // --- IndicatorCache ---

    fn indicator(date: &str, demand: Demand, traffic: Traffic, mismatches: u32) -> DayIndicator {
        DayIndicator {
            date: d(date),
            demand,
            traffic,
            mismatches,
        }
    }

    #[test]
    fn cache_pins_first_seen_demand_and_traffic_but_refreshes_mismatches() {
        let mut cache = IndicatorCache::new();
        let first: HashMap<_, _> = [(
            d("2025-08-04"),
            indicator("2025-08-04", Demand::Coffee, Traffic::Low, 0),
        )]
        .into_iter()
        .collect();
        cache.apply("2025-W32", first);

        let second: HashMap<_, _> = [(
            d("2025-08-04"),
            indicator("2025-08-04", Demand::Mixed, Traffic::High, 5),
        )]
        .into_iter()
        .collect();
        let merged = cache.apply("2025-W32", second);
        let day = merged.get(&d("2025-08-04")).unwrap();
        assert_eq!(day.demand, Demand::Coffee);
        assert_eq!(day.traffic, Traffic::Low);
        assert_eq!(day.mismatches, 5);
    }

    #[test]
    fn cache_resets_on_week_change() {
        let mut cache = IndicatorCache::new();
        let first: HashMap<_, _> = [(
            d("2025-08-04"),
            indicator("2025-08-04", Demand::Coffee, Traffic::Low, 0),
        )]
        .into_iter()
        .collect();
        cache.apply("2025-W32", first);

        let next_week: HashMap<_, _> = [(
            d("2025-08-11"),
            indicator("2025-08-11", Demand::Sandwich, Traffic::High, 2),
        )]
        .into_iter()
        .collect();
        let merged = cache.apply("2025-W33", next_week);
        let day = merged.get(&d("2025-08-11")).unwrap();
        assert_eq!(day.demand, Demand::Sandwich);
        assert_eq!(day.traffic, Traffic::High);
    }

    // --- Scoring ---

    #[test]
    fn tone_thresholds_sit_at_80_and_56() {
        assert_eq!(score_to_tone(80.0), Tone::Good);
        assert_eq!(score_to_tone(79.9), Tone::Warn);
        assert_eq!(score_to_tone(56.0), Tone::Warn);
        assert_eq!(score_to_tone(55.9), Tone::Alert);
        assert_eq!(score_to_tone(0.0), Tone::Alert);
    }

    #[test]
    fn scorer_weights_the_matching_skill() {
        let specialist = create_test_employee(1, "Specialist", &[(SKILL_COFFEE, 100.0)]);
        let scorer = SkillWeightScorer;
        // 0.6 * 100 with nothing else
        assert!((scorer.score(&specialist, Some(Demand::Coffee)) - 60.0).abs() < 1e-9);
        // Sandwich demand ignores the coffee skill entirely
        assert_eq!(scorer.score(&specialist, Some(Demand::Sandwich)), 0.0);
        // Mixed averages the four base skills
        assert_eq!(scorer.score(&specialist, Some(Demand::Mixed)), 25.0);
    }

    #[test]
    fn scorer_is_monotonic_in_the_matching_skill() {
        let scorer = SkillWeightScorer;
        let weaker = create_test_employee(1, "W", &[(SKILL_COFFEE, 40.0)]);
        let stronger = create_test_employee(2, "S", &[(SKILL_COFFEE, 70.0)]);
        assert!(
            scorer.score(&stronger, Some(Demand::Coffee))
                > scorer.score(&weaker, Some(Demand::Coffee))
        );
    }

    #[test]
    fn scorer_defaults_unknown_skills_to_zero() {
        let scorer = SkillWeightScorer;
        let employee = create_test_employee(1, "Nobody", &[("juggling", 100.0)]);
        assert_eq!(scorer.score(&employee, Some(Demand::Coffee)), 0.0);
        assert_eq!(scorer.score(&employee, None), 0.0);
    }

    #[test]
    fn overall_score_uses_the_config_weight_table() {
        let employee = create_test_employee(
            1,
            "E",
            &[(SKILL_COFFEE, 80.0), (SKILL_SANDWICH, 40.0)],
        );
        let weights: HashMap<String, f64> = [
            ("coffee".to_string(), 1.0),
            ("sandwich".to_string(), 1.0),
        ]
        .into_iter()
        .collect();
        assert!((overall_score(&employee, &weights) - 60.0).abs() < 1e-9);
        assert_eq!(overall_score(&employee, &HashMap::new()), 0.0);
    }
}
