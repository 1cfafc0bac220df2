//! Static mentor catalog.
//!
//! Hardcoded reference data. The marketplace lists the full catalog; the
//! ranking just floats mentors whose specialty overlaps the snapshot's
//! theme or bottleneck to the top.

use std::sync::LazyLock;

use unloop_types::mentor::{Mentor, MentorType};
use unloop_types::snapshot::LifeSnapshot;

static CATALOG: LazyLock<Vec<Mentor>> = LazyLock::new(|| {
    vec![
        Mentor {
            id: "mentor-maya".to_string(),
            name: "Maya Chen".to_string(),
            mentor_type: MentorType::Listener,
            tagline: "Space to think out loud".to_string(),
            specialty: "burnout, exhaustion, recovery".to_string(),
            match_reason: "You need room to hear yourself before any plan makes sense."
                .to_string(),
        },
        Mentor {
            id: "mentor-jonas".to_string(),
            name: "Jonas Okafor".to_string(),
            mentor_type: MentorType::Listener,
            tagline: "Unhurried, judgment-free reflection".to_string(),
            specialty: "anxiety, overwhelm, relationships".to_string(),
            match_reason: "Your pattern is carrying things alone; Jonas specializes in \
                           helping people put the load into words."
                .to_string(),
        },
        Mentor {
            id: "mentor-priya".to_string(),
            name: "Priya Raman".to_string(),
            mentor_type: MentorType::DomainStrategist,
            tagline: "From stuck to a concrete next move".to_string(),
            specialty: "career, work, promotion, job change".to_string(),
            match_reason: "Your bottleneck is a career decision; Priya has walked \
                           hundreds of people through exactly this fork."
                .to_string(),
        },
        Mentor {
            id: "mentor-dmitri".to_string(),
            name: "Dmitri Volkov".to_string(),
            mentor_type: MentorType::DomainStrategist,
            tagline: "Strategy for founders and builders".to_string(),
            specialty: "startup, business, money, risk".to_string(),
            match_reason: "You keep circling a venture you have not committed to; \
                           Dmitri helps turn circling into a tested decision."
                .to_string(),
        },
        Mentor {
            id: "mentor-amara".to_string(),
            name: "Amara Diallo".to_string(),
            mentor_type: MentorType::ClarityArchitect,
            tagline: "Untangle the knot, name the thread".to_string(),
            specialty: "direction, purpose, values, identity".to_string(),
            match_reason: "Your snapshot points at a values conflict rather than a \
                           logistics problem; Amara works at exactly that layer."
                .to_string(),
        },
        Mentor {
            id: "mentor-theo".to_string(),
            name: "Theo Lindqvist".to_string(),
            mentor_type: MentorType::ClarityArchitect,
            tagline: "Structure for a foggy season".to_string(),
            specialty: "habits, energy, focus, routine".to_string(),
            match_reason: "Your energy balance is running at a deficit; Theo rebuilds \
                           weeks around what actually restores you."
                .to_string(),
        },
    ]
});

/// The full catalog, in presentation order.
pub fn all() -> &'static [Mentor] {
    &CATALOG
}

/// Look up a mentor by id.
pub fn find(id: &str) -> Option<&'static Mentor> {
    CATALOG.iter().find(|m| m.id == id)
}

/// Catalog reordered for a snapshot: mentors whose specialty terms appear
/// in the primary theme or bottleneck come first, otherwise catalog order
/// is preserved.
pub fn ranked_for(snapshot: &LifeSnapshot) -> Vec<&'static Mentor> {
    let haystack = format!(
        "{} {}",
        snapshot.primary_theme.to_lowercase(),
        snapshot.the_bottleneck.to_lowercase()
    );
    let mut ranked: Vec<&Mentor> = CATALOG.iter().collect();
    ranked.sort_by_key(|mentor| {
        let hits = mentor
            .specialty
            .split(',')
            .map(str::trim)
            .filter(|term| !term.is_empty() && haystack.contains(term))
            .count();
        std::cmp::Reverse(hits)
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use unloop_types::snapshot::{EnergyBalance, LifeSnapshot};

    fn snapshot(theme: &str, bottleneck: &str) -> LifeSnapshot {
        LifeSnapshot {
            primary_theme: theme.to_string(),
            the_bottleneck: bottleneck.to_string(),
            pattern_matrix: Vec::new(),
            energy_balance: EnergyBalance {
                drains: 7,
                gains: 3,
                description: "lopsided".to_string(),
            },
            low_effort_action: "take a walk".to_string(),
        }
    }

    #[test]
    fn test_catalog_has_every_mentor_type() {
        for mt in [
            MentorType::Listener,
            MentorType::DomainStrategist,
            MentorType::ClarityArchitect,
        ] {
            assert!(all().iter().any(|m| m.mentor_type == mt));
        }
    }

    #[test]
    fn test_catalog_ids_are_unique() {
        let mut ids: Vec<&str> = all().iter().map(|m| m.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), all().len());
    }

    #[test]
    fn test_find_known_and_unknown() {
        assert!(find("mentor-maya").is_some());
        assert!(find("mentor-nobody").is_none());
    }

    #[test]
    fn test_ranking_floats_specialty_match() {
        let snapshot = snapshot("Career stagnation at work", "Fear of a job change");
        let ranked = ranked_for(&snapshot);
        assert_eq!(ranked[0].id, "mentor-priya");
        assert_eq!(ranked.len(), all().len());
    }

    #[test]
    fn test_ranking_without_match_preserves_catalog_order() {
        let snapshot = snapshot("Something unrelated", "No overlap here");
        let ranked = ranked_for(&snapshot);
        let catalog_ids: Vec<&str> = all().iter().map(|m| m.id.as_str()).collect();
        let ranked_ids: Vec<&str> = ranked.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ranked_ids, catalog_ids);
    }
}
