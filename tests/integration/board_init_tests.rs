//! Topology selection, rebuild and lifecycle.

use crate::mock_gateway::{GatewayCall, run};

use poolboard::app::events::StateChange;
use poolboard::board::lifecycle::BoardState;
use poolboard::equipment::{BodyType, Category, CircuitFunction, VirtualCircuit};
use poolboard::error::BoardError;

#[test]
fn shared_model_builds_two_bodies_and_synthetic_valves() {
    run(|board, _gw, _feed| async move {
        let config = board.set_model("nxps").await.unwrap();

        assert_eq!(board.board_state(), BoardState::Ready);
        assert_eq!(config.bodies.len(), 2);
        assert_eq!(config.circuits[&6].function, CircuitFunction::Pool);
        assert_eq!(config.circuits[&1].function, CircuitFunction::Spa);
        assert_eq!(config.bodies[&2].body_type, BodyType::Spa);

        let intake: Vec<_> = config.valves.values().filter(|v| v.is_intake).collect();
        let ret: Vec<_> = config.valves.values().filter(|v| v.is_return).collect();
        assert_eq!(intake.len(), 1);
        assert_eq!(ret.len(), 1);
        assert_eq!(intake[0].circuit, VirtualCircuit::POOL_SPA);

        let state = board.state_snapshot();
        assert_eq!(state.status.val, 1);
        assert_eq!(state.status.percent, 100);
        assert_eq!(state.valves.len(), 2);
    });
}

#[test]
fn dual_model_has_two_pool_bodies_and_no_valves() {
    run(|board, _gw, _feed| async move {
        let config = board.set_model("nxpd").await.unwrap();
        assert_eq!(config.bodies.len(), 2);
        assert!(config.valves.is_empty());
        assert_eq!(config.bodies[&2].body_type, BodyType::Pool);
        assert_eq!(config.circuits[&1].function, CircuitFunction::Pool);
    });
}

#[test]
fn switching_shared_to_dual_removes_valves_and_broadcasts() {
    run(|board, _gw, feed| async move {
        board.set_model("nxps").await.unwrap();
        feed.drain();

        let config = board.set_model("nxpd").await.unwrap();
        assert!(config.valves.is_empty());
        assert!(board.state_snapshot().valves.is_empty());

        let removed: Vec<_> = feed
            .drain()
            .into_iter()
            .filter(|c| matches!(c, StateChange::Removed { category: Category::Valve, .. }))
            .collect();
        assert_eq!(removed.len(), 2);
    });
}

#[test]
fn no_body_model_removes_every_body_circuit() {
    run(|board, _gw, _feed| async move {
        board.set_model("nxps").await.unwrap();
        let config = board.set_model("nxnb").await.unwrap();
        assert!(config.bodies.is_empty());
        assert!(!config.circuits.contains_key(&1));
        assert!(!config.circuits.contains_key(&6));
        let state = board.state_snapshot();
        assert!(state.bodies.is_empty());
        assert!(state.circuits.is_empty());
    });
}

#[test]
fn rebuild_keeps_user_body_names() {
    run(|board, _gw, _feed| async move {
        board.set_model("nxp").await.unwrap();
        board
            .bodies()
            .set_body(poolboard::commands::bodies::BodyUpdate {
                id: 1,
                name: Some("Lagoon".into()),
                capacity: Some(18_000),
                ..Default::default()
            })
            .unwrap();
        let config = board.set_model("nxps").await.unwrap();
        assert_eq!(config.bodies[&1].name, "Lagoon");
        assert_eq!(config.bodies[&1].capacity, 18_000);
    });
}

#[test]
fn unknown_model_fails_the_board() {
    run(|board, _gw, _feed| async move {
        let err = board.set_model("intellicenter").await.unwrap_err();
        assert_eq!(err, BoardError::UnknownModel("intellicenter".into()));
        assert_eq!(board.board_state(), BoardState::Failed);
        assert_eq!(board.state_snapshot().status.val, 255);
        assert!(!board.is_status_suspended());

        // A valid model recovers.
        board.set_model("nxp").await.unwrap();
        assert_eq!(board.board_state(), BoardState::Ready);
    });
}

#[test]
fn gateway_initialize_failure_is_fatal() {
    run(|board, gw, _feed| async move {
        gw.fail_initialize();
        let err = board.set_model("nxp").await.unwrap_err();
        assert!(matches!(err, BoardError::InitializationFailure(_)));
        assert_eq!(board.board_state(), BoardState::Failed);
    });
}

#[test]
fn verify_failures_become_equipment_messages() {
    run(|board, gw, _feed| async move {
        gw.fail_validate(6);
        board.set_model("nxp").await.unwrap();
        assert_eq!(board.board_state(), BoardState::Ready);

        let messages = board.state_snapshot().messages;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].code, "EQ");
        assert!(messages[0].message.contains("circuit 6"));

        // Re-initialising clears old EQ messages before verifying again.
        gw.state.borrow_mut().fail_validate.clear();
        board.initialize().await.unwrap();
        assert!(board.state_snapshot().messages.is_empty());
    });
}

#[test]
fn verify_runs_before_gateway_initialize() {
    run(|board, gw, _feed| async move {
        board.set_model("nxp").await.unwrap();
        let calls = gw.calls();
        let validate = calls
            .iter()
            .position(|c| *c == GatewayCall::ValidateCircuit(6))
            .unwrap();
        let init = calls.iter().position(|c| *c == GatewayCall::Initialize).unwrap();
        assert!(validate < init);
    });
}

#[test]
fn lifecycle_statuses_are_broadcast_in_order() {
    run(|board, _gw, feed| async move {
        board.set_model("nxp").await.unwrap();
        let codes: Vec<u8> = feed
            .drain()
            .into_iter()
            .filter_map(|c| match c {
                StateChange::Status(s) => Some(s.val),
                _ => None,
            })
            .collect();
        assert_eq!(codes, vec![0, 2, 1]);
    });
}

#[test]
fn id_ranges_are_published() {
    run(|board, _gw, _feed| async move {
        let config = board.set_model("nxp").await.unwrap();
        let ids = config.equipment_ids.unwrap();
        assert_eq!(ids.features.start, 129);
        assert_eq!(ids.circuit_groups.start, 193);
        assert_eq!(ids.virtual_circuits.end, 254);
    });
}

#[test]
fn snapshot_reload_reinitialises_to_same_shape() {
    run(|board, _gw, _feed| async move {
        let config = board.set_model("nxps").await.unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let restored: poolboard::tree::config::ConfigTree = serde_json::from_str(&json).unwrap();

        board.load_snapshot(restored);
        let rebuilt = board.initialize().await.unwrap();
        assert_eq!(rebuilt.bodies, config.bodies);
        assert_eq!(rebuilt.valves, config.valves);
    });
}

#[test]
fn loaded_snapshot_derives_dont_stop_from_egg_timer() {
    run(|board, _gw, _feed| async move {
        let mut config = board.set_model("nxp").await.unwrap();
        let mut jets = config.circuits[&6].clone();
        jets.id = 2;
        jets.name = "Jets".into();
        jets.egg_timer = 1440;
        jets.dont_stop = false;
        config.circuits.insert(2, jets);
        config.circuits.get_mut(&6).unwrap().dont_stop = true;

        board.load_snapshot(config);
        let loaded = board.config_snapshot();
        assert!(loaded.circuits[&2].dont_stop);
        assert_eq!(loaded.circuits[&6].dont_stop, loaded.circuits[&6].egg_timer == 1440);
    });
}
