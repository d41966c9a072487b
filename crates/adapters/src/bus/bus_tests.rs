// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn exact_topics_match() {
    assert!(topic_matches("cruce/solicitud", "cruce/solicitud"));
    assert!(!topic_matches("cruce/solicitud", "cruce/respuesta"));
    assert!(!topic_matches("cruce", "cruce/solicitud"));
    assert!(!topic_matches("cruce/solicitud", "cruce"));
}

#[test]
fn plus_matches_one_level() {
    assert!(topic_matches("cruce/estado/+", "cruce/estado/cola"));
    assert!(topic_matches("+/estado/+", "cruce/estado/active_robot"));
    assert!(!topic_matches("cruce/+", "cruce/estado/cola"));
}

#[test]
fn hash_matches_the_rest() {
    assert!(topic_matches("#", "robots/solicitar_estado"));
    assert!(topic_matches("cruce/#", "cruce/estado/cola"));
    assert!(topic_matches("cruce/#", "cruce"));
    assert!(!topic_matches("cruce/#", "robots/solicitar_estado"));
}

#[test]
fn filters_are_validated() {
    assert!(validate_filter("cruce/#").is_ok());
    assert!(validate_filter("+/estado/+").is_ok());
    assert!(validate_filter("").is_err());
    assert!(validate_filter("cruce/#/cola").is_err());
    assert!(validate_filter("cruce/esta+do").is_err());
}

#[test]
fn publication_builder_sets_flags() {
    let publication = Publication::new("cruce/estado/cola", "vertical_A|").reliable().retained();

    assert!(publication.reliable);
    assert!(publication.retain);
    assert_eq!(publication.payload, b"vertical_A|".to_vec());
}
