use hazard_sweeper::*;
use proptest::prelude::*;
use std::collections::HashSet;

/// A layout of `size` with the default openings kept clear.
fn layout_from(size: usize, mask: &[bool], strategy: Strategy) -> Layout {
    let openings: Vec<usize> = default_openings(size, strategy)
        .iter()
        .map(|p| p.y * size + p.x)
        .collect();
    let hazards = (0..size * size)
        .map(|i| mask[i] && !openings.contains(&i))
        .collect();
    Layout::new(size, hazards).unwrap()
}

fn check_episode(layout: &Layout, agent: &Agent) -> Result<(), TestCaseError> {
    let outcome = agent.outcome();
    prop_assert!(outcome.is_some());
    prop_assert_ne!(outcome, Some(Outcome::Lost));

    let mut probed = HashSet::new();
    for m in agent.moves() {
        match m.action {
            Action::Probe => {
                prop_assert!(!m.exposed, "probed hazard at {}", m.point);
                prop_assert!(!layout.is_hazard(m.point));
                prop_assert!(probed.insert(m.point), "probed {} twice", m.point);
            }
            Action::Flag => prop_assert!(layout.is_hazard(m.point), "bad flag at {}", m.point),
        }
    }

    let board = agent.board();
    let all_safe_revealed = board
        .points()
        .filter(|&p| !layout.is_hazard(p))
        .all(|p| matches!(board.state(p), CellState::Revealed(_)));
    prop_assert_eq!(outcome == Some(Outcome::Won), all_safe_revealed);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// No reasoning strategy ever probes a hazard or flags a safe cell.
    #[test]
    fn prop_deductions_are_sound(
        size in 2usize..=5,
        mask in prop::collection::vec(prop::bool::weighted(0.25), 25),
    ) {
        for strategy in [Strategy::SinglePointOnly, Strategy::SatCnf] {
            let layout = layout_from(size, &mask, strategy);
            let mut agent = Agent::new(layout.clone(), EpisodeConfig::new(strategy)).unwrap();
            agent.run().unwrap();
            check_episode(&layout, &agent)?;
        }
    }

    /// Both oracle encodings prove the same cells in the same order.
    #[test]
    fn prop_oracle_encodings_agree(
        size in 2usize..=5,
        mask in prop::collection::vec(prop::bool::weighted(0.25), 25),
    ) {
        let layout = layout_from(size, &mask, Strategy::SatCnf);

        let mut dnf = Agent::new(layout.clone(), EpisodeConfig::new(Strategy::SatDnf)).unwrap();
        let mut cnf = Agent::new(layout.clone(), EpisodeConfig::new(Strategy::SatCnf)).unwrap();
        prop_assert_eq!(dnf.run().unwrap(), cnf.run().unwrap());
        prop_assert_eq!(dnf.moves(), cnf.moves());
        check_episode(&layout, &dnf)?;
    }

    /// The oracle never does worse than single-point inference alone.
    #[test]
    fn prop_oracle_reveals_at_least_as_much(
        size in 2usize..=5,
        mask in prop::collection::vec(prop::bool::weighted(0.25), 25),
    ) {
        let layout = layout_from(size, &mask, Strategy::SatCnf);

        let mut local = Agent::new(layout.clone(), EpisodeConfig::new(Strategy::SinglePointOnly)).unwrap();
        let mut full = Agent::new(layout, EpisodeConfig::new(Strategy::SatCnf)).unwrap();
        local.run().unwrap();
        full.run().unwrap();
        prop_assert!(full.board().unknown_count() <= local.board().unknown_count());
        if local.outcome() == Some(Outcome::Won) {
            prop_assert_eq!(full.outcome(), Some(Outcome::Won));
        }
    }

    /// A tolerated policy never reports an exposure when every probe is sound.
    #[test]
    fn prop_tolerated_policy_matches_fatal_on_clear_openings(
        size in 2usize..=5,
        mask in prop::collection::vec(prop::bool::weighted(0.25), 25),
    ) {
        let layout = layout_from(size, &mask, Strategy::SatCnf);

        let mut fatal = Agent::new(layout.clone(), EpisodeConfig::new(Strategy::SatCnf)).unwrap();
        let mut tolerated = Agent::new(
            layout,
            EpisodeConfig::new(Strategy::SatCnf).with_hazard_policy(HazardPolicy::Tolerated),
        )
        .unwrap();
        prop_assert_eq!(fatal.run().unwrap(), tolerated.run().unwrap());
        prop_assert_eq!(fatal.moves(), tolerated.moves());
        prop_assert_eq!(tolerated.exposures(), 0);
    }
}
