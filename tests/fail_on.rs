use gitvitals_core::RiskLevel;

#[test]
fn fail_on_passes_when_nothing_reaches_threshold() {
    let levels = [RiskLevel::Low, RiskLevel::Medium];
    let threshold = RiskLevel::High;

    assert!(!levels.iter().any(|r| r.is_at_least(threshold)));
}

#[test]
fn fail_on_trips_when_a_metric_reaches_threshold() {
    let levels = [RiskLevel::Critical, RiskLevel::Low];
    let threshold = RiskLevel::Medium;

    assert!(levels.iter().any(|r| r.is_at_least(threshold)));
}

#[test]
fn fail_on_high_catches_high_and_critical() {
    let threshold = RiskLevel::High;

    assert!(RiskLevel::Critical.is_at_least(threshold));
    assert!(RiskLevel::High.is_at_least(threshold));
    assert!(!RiskLevel::Medium.is_at_least(threshold));
    assert!(!RiskLevel::Low.is_at_least(threshold));
}

#[test]
fn unknown_never_fails_the_run() {
    for threshold in [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ] {
        assert!(!RiskLevel::Unknown.is_at_least(threshold));
    }
}

#[test]
fn threshold_parses_case_insensitively() {
    assert_eq!("high".parse::<RiskLevel>().unwrap(), RiskLevel::High);
    assert_eq!("CRITICAL".parse::<RiskLevel>().unwrap(), RiskLevel::Critical);
    assert!("severe".parse::<RiskLevel>().is_err());
}
