//! Circuit and feature routing, shared-body exclusion and valve follow-up.

use std::rc::Rc;
use std::time::Duration;

use edge_executor::LocalExecutor;
use futures_lite::future::block_on;

use crate::mock_gateway::{GatewayCall, MockGateway, run, sleep_ms, test_config};

use poolboard::app::events::StateChange;
use poolboard::board::Board;
use poolboard::commands::circuits::{CircuitUpdate, ReferenceFilter};
use poolboard::commands::features::FeatureUpdate;
use poolboard::commands::groups::{CircuitGroupUpdate, GroupMemberUpdate};
use poolboard::equipment::{Category, CircuitFunction, DesiredState};
use poolboard::error::{BoardError, GatewayError};

/// Replay relay commands and fail if pool (6) and spa (1) are ever on
/// together.
fn assert_bodies_never_both_on(commands: &[(u16, bool)]) {
    let (mut pool, mut spa) = (false, false);
    for &(id, on) in commands {
        match id {
            6 => pool = on,
            1 => spa = on,
            _ => {}
        }
        assert!(!(pool && spa), "pool and spa both on in {commands:?}");
    }
}

#[test]
fn shared_body_turns_the_other_body_off_first() {
    run(|board, gw, _feed| async move {
        board.set_model("nxps").await.unwrap();
        gw.clear_calls();

        board.circuits().set_state(6, true).await.unwrap();
        board.circuits().set_state(1, true).await.unwrap();

        let state = board.state_snapshot();
        assert!(!state.circuits[&6].is_on);
        assert!(state.circuits[&1].is_on);
        assert!(!state.bodies[&1].is_on);
        assert!(state.bodies[&2].is_on);
        let commands = gw.relay_commands();
        assert_bodies_never_both_on(&commands);
        assert_eq!(commands, vec![(6, true), (6, false), (1, true)]);
    });
}

#[test]
fn group_with_both_bodies_switches_them_in_turn() {
    run(|board, gw, _feed| async move {
        board.set_model("nxps").await.unwrap();
        board
            .groups()
            .set_circuit_group(CircuitGroupUpdate {
                members: Some(
                    [6, 1]
                        .into_iter()
                        .map(|circuit| GroupMemberUpdate {
                            circuit: Some(circuit),
                            desired_state: Some(DesiredState::On),
                        })
                        .collect(),
                ),
                ..Default::default()
            })
            .unwrap();
        gw.set_relay_delay(Duration::from_millis(5));
        gw.clear_calls();

        board.circuits().set_state(193, true).await.unwrap();

        let commands = gw.relay_commands();
        assert_bodies_never_both_on(&commands);
        assert_eq!(commands, vec![(6, true), (6, false), (1, true)]);
        let state = board.state_snapshot();
        assert!(!state.circuits[&6].is_on);
        assert!(state.circuits[&1].is_on);
    });
}

#[test]
fn spawned_body_commands_never_overlap() {
    let executor = Rc::new(LocalExecutor::new());
    let gw = MockGateway::new();
    let board = Board::new(test_config(), gw.clone(), Rc::clone(&executor));
    block_on(executor.run(async {
        board.set_model("nxps").await.unwrap();
        gw.set_relay_delay(Duration::from_millis(5));
        gw.clear_calls();

        let spawn_on = |id: u16| {
            let board = board.clone();
            executor.spawn(async move { board.circuits().set_state(id, true).await })
        };
        let spa = spawn_on(1);
        let pool = spawn_on(6);
        spa.await.unwrap();
        pool.await.unwrap();

        assert_bodies_never_both_on(&gw.relay_commands());
        let state = board.state_snapshot();
        assert_ne!(state.circuits[&6].is_on, state.circuits[&1].is_on);
        assert!(!board.is_status_suspended());
    }));
}

#[test]
fn dual_bodies_run_together() {
    run(|board, gw, _feed| async move {
        board.set_model("nxpd").await.unwrap();
        gw.clear_calls();

        board.circuits().set_state(6, true).await.unwrap();
        board.circuits().set_state(1, true).await.unwrap();

        let state = board.state_snapshot();
        assert!(state.circuits[&6].is_on);
        assert!(state.circuits[&1].is_on);
        assert_eq!(gw.relay_commands(), vec![(6, true), (1, true)]);
    });
}

#[test]
fn relay_failure_leaves_state_untouched_and_resumes_polling() {
    run(|board, gw, _feed| async move {
        board.set_model("nxp").await.unwrap();
        gw.fail_circuit(6);

        let err = board.circuits().set_state(6, true).await.unwrap_err();
        assert_eq!(
            err,
            BoardError::HardwareFailure(GatewayError::Command("relay 6 stuck".into()))
        );
        assert!(!board.state_snapshot().circuits[&6].is_on);
        assert!(!board.is_status_suspended());
        assert!(gw.calls().contains(&GatewayCall::SyncPumps));
    });
}

#[test]
fn unknown_ids_are_rejected() {
    run(|board, _gw, _feed| async move {
        board.set_model("nxp").await.unwrap();
        let circuits = board.circuits();

        assert!(matches!(
            circuits.set_state(300, true).await,
            Err(BoardError::InvalidId { .. })
        ));
        assert!(matches!(
            circuits.set_state(7, true).await,
            Err(BoardError::NotFound { .. })
        ));
        assert!(matches!(
            circuits.set_state(130, true).await,
            Err(BoardError::NotFound { .. })
        ));
    });
}

#[test]
fn features_change_state_without_a_relay() {
    run(|board, gw, _feed| async move {
        board.set_model("nxp").await.unwrap();
        let feature = board
            .features()
            .set_feature(FeatureUpdate::default())
            .await
            .unwrap();
        assert_eq!(feature.id, 129);
        assert_eq!(feature.name, "feature129");
        gw.clear_calls();

        board.circuits().set_state(129, true).await.unwrap();
        assert!(board.state_snapshot().features[&129].is_on);
        assert!(gw.relay_commands().is_empty());

        board.features().toggle_feature_state(129).await.unwrap();
        assert!(!board.state_snapshot().features[&129].is_on);
    });
}

#[test]
fn new_circuits_skip_body_ids_and_derive_dont_stop() {
    run(|board, gw, _feed| async move {
        board.set_model("nxp").await.unwrap();
        let circuits = board.circuits();

        let first = circuits
            .set_circuit(CircuitUpdate {
                name: Some("Jets".into()),
                egg_timer: Some(1440),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(first.id, 2);
        assert!(first.dont_stop);
        assert_eq!(first.egg_timer, 1440);

        let second = circuits
            .set_circuit(CircuitUpdate {
                id: Some(0),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(second.id, 3);
        assert_eq!(second.egg_timer, 720);
        assert!(!second.dont_stop);

        // Partial update keeps the name.
        let updated = circuits
            .set_circuit(CircuitUpdate {
                id: Some(2),
                egg_timer: Some(60),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.name, "Jets");
        assert!(!updated.dont_stop);

        // Metadata reaches the gateway in the background.
        sleep_ms(5).await;
        assert!(gw.calls().contains(&GatewayCall::SetCircuit(2)));
    });
}

#[test]
fn delete_removes_from_both_trees_and_broadcasts() {
    run(|board, gw, feed| async move {
        board.set_model("nxp").await.unwrap();
        let c = board.circuits().set_circuit(CircuitUpdate::default()).await.unwrap();
        feed.drain();

        board.circuits().delete_circuit(c.id).await.unwrap();
        assert!(!board.config_snapshot().circuits.contains_key(&c.id));
        assert!(!board.state_snapshot().circuits.contains_key(&c.id));
        assert!(gw.calls().contains(&GatewayCall::RemoveCircuit(c.id)));
        assert!(feed.drain().contains(&StateChange::Removed {
            category: Category::Circuit,
            id: c.id,
        }));

        assert!(matches!(
            board.circuits().delete_circuit(c.id).await,
            Err(BoardError::NotFound { .. })
        ));
    });
}

#[test]
fn intake_and_return_follow_the_spa() {
    run(|board, gw, _feed| async move {
        board.set_model("nxps").await.unwrap();
        gw.clear_calls();

        board.circuits().set_state(1, true).await.unwrap();
        let state = board.state_snapshot();
        assert!(state.valves.values().all(|v| v.is_diverted));
        assert_eq!(gw.valve_commands().len(), 2);

        board.circuits().set_state(6, true).await.unwrap();
        let state = board.state_snapshot();
        assert!(state.valves.values().all(|v| !v.is_diverted));
    });
}

#[test]
fn light_theme_and_dimmer() {
    run(|board, _gw, _feed| async move {
        board.set_model("nxp").await.unwrap();
        let light = board
            .circuits()
            .set_circuit(CircuitUpdate {
                function: Some(CircuitFunction::IntelliBrite),
                ..Default::default()
            })
            .await
            .unwrap();

        board.circuits().set_light_theme(light.id, 177).await.unwrap();
        assert!(matches!(
            board.circuits().set_light_theme(light.id, 42).await,
            Err(BoardError::InvalidParameter(_))
        ));
        assert!(matches!(
            board.circuits().set_light_theme(6, 177).await,
            Err(BoardError::InvalidParameter(_))
        ));

        board.circuits().set_dimmer_level(light.id, 40).await.unwrap();
        let state = board.state_snapshot();
        assert_eq!(state.circuits[&light.id].level, Some(40));
        assert!(state.circuits[&light.id].is_on);

        let lights = board.circuits().light_references();
        assert_eq!(lights.len(), 1);
        assert_eq!(lights[0].id, light.id);
    });
}

#[test]
fn references_cover_every_requested_kind() {
    run(|board, _gw, _feed| async move {
        board.set_model("nxp").await.unwrap();
        board.features().set_feature(FeatureUpdate::default()).await.unwrap();

        let refs = board.circuits().circuit_references(ReferenceFilter {
            circuits: true,
            features: true,
            virtual_circuits: true,
            groups: false,
        });
        assert!(refs.iter().any(|r| r.id == 6 && r.category == Category::Circuit));
        assert!(refs.iter().any(|r| r.id == 129 && r.category == Category::Feature));
        assert!(refs.iter().any(|r| r.id == 247 && r.category == Category::VirtualCircuit));
        assert!(refs.windows(2).all(|w| w[0].id <= w[1].id));
    });
}
