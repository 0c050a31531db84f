/// Tests for EngineSettings and PresentMode

use super::*;

// ============================================================================
// Tests: PresentMode
// ============================================================================

#[test]
fn test_present_mode_from_str() {
    assert_eq!("Fifo".parse::<PresentMode>().unwrap(), PresentMode::Fifo);
    assert_eq!("Mailbox".parse::<PresentMode>().unwrap(), PresentMode::Mailbox);
    assert_eq!("BestAvailable".parse::<PresentMode>().unwrap(), PresentMode::BestAvailable);
}

#[test]
fn test_present_mode_unknown_is_config_error() {
    let result = "VSync".parse::<PresentMode>();
    assert!(matches!(result, Err(Error::Config(_))));
}

// ============================================================================
// Tests: Defaults
// ============================================================================

#[test]
fn test_defaults_are_valid() {
    let settings = EngineSettings::default();
    assert_eq!(settings.frames_in_flight, 3);
    assert_eq!(settings.water_reflection_width, 300);
    assert!(settings.validate().is_ok());
}

#[test]
fn test_effective_cascade_count() {
    let mut settings = EngineSettings::default();
    assert_eq!(settings.effective_cascade_count(), 1);
    settings.use_cascade_shadow_map = true;
    settings.cascade_count = 4;
    assert_eq!(settings.effective_cascade_count(), 4);
}

// ============================================================================
// Tests: Validation
// ============================================================================

#[test]
fn test_zero_frames_in_flight_rejected() {
    let settings = EngineSettings { frames_in_flight: 0, ..Default::default() };
    assert!(matches!(settings.validate(), Err(Error::Config(_))));
}

#[test]
fn test_bad_msaa_rejected() {
    let settings = EngineSettings { msaa_samples: 3, ..Default::default() };
    assert!(settings.validate().is_err());
}

#[test]
fn test_cascades_beyond_limit_rejected() {
    let settings = EngineSettings {
        use_cascade_shadow_map: true,
        cascade_count: 8,
        ..Default::default()
    };
    assert!(settings.validate().is_err());
}

#[test]
fn test_point_lights_beyond_limit_rejected() {
    let settings = EngineSettings { point_light_count: 5, ..Default::default() };
    assert!(settings.validate().is_err());
}

#[test]
fn test_post_effects_require_screen_quad() {
    let settings = EngineSettings {
        post_effects: vec![PostEffectSettings {
            name: "bloom".to_string(),
            material: "bloom_material".to_string(),
            size: None,
        }],
        ..Default::default()
    };
    assert!(settings.validate().is_err());

    let settings = EngineSettings { use_screen_quad: true, ..settings };
    assert!(settings.validate().is_ok());
}
