//! Valves, heaters, bodies and chemistry controllers.

use crate::mock_gateway::{GatewayCall, run};

use poolboard::commands::bodies::BodyUpdate;
use poolboard::commands::chem::ChemControllerUpdate;
use poolboard::commands::heaters::HeaterUpdate;
use poolboard::commands::valves::ValveUpdate;
use poolboard::equipment::{ChemControllerType, HeatSource, HeaterType};
use poolboard::error::BoardError;
use poolboard::tree::state::ChemReadings;

// ── Valves ────────────────────────────────────────────────────

#[test]
fn user_valves_start_above_the_floor() {
    run(|board, gw, _feed| async move {
        board.set_model("nxps").await.unwrap();
        let valve = board.valves().set_valve(ValveUpdate::default()).await.unwrap();
        assert_eq!(valve.id, 50);
        assert!(gw.calls().contains(&GatewayCall::SetValve(50)));

        let next = board.valves().set_valve(ValveUpdate::default()).await.unwrap();
        assert_eq!(next.id, 51);

        // Id 0 asks for a fresh id.
        let zero = board
            .valves()
            .set_valve(ValveUpdate {
                id: Some(0),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(zero.id, 52);
    });
}

#[test]
fn config_writes_survive_a_gateway_rejection() {
    run(|board, gw, _feed| async move {
        board.set_model("nxp").await.unwrap();
        board
            .valves()
            .set_valve(ValveUpdate {
                name: Some("Waterfall".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        gw.fail_config();

        let err = board
            .valves()
            .set_valve(ValveUpdate {
                id: Some(50),
                name: Some("Renamed".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::HardwareFailure(_)));
        assert_eq!(board.config_snapshot().valves[&50].name, "Renamed");
        assert_eq!(board.state_snapshot().valves[&50].name, "Renamed");

        let err = board
            .heaters()
            .set_heater(HeaterUpdate {
                heater_type: Some(HeaterType::Gas),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::HardwareFailure(_)));
        assert!(board.config_snapshot().heaters.contains_key(&256));
        assert_eq!(
            board.state_snapshot().bodies[&1].heat_sources,
            vec![HeatSource::Off, HeatSource::Heater]
        );

        let err = board
            .chem_controllers()
            .set_chem_controller(ChemControllerUpdate {
                chem_type: Some(ChemControllerType::IntelliChem),
                address: Some(144),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::HardwareFailure(_)));
        assert!(board.config_snapshot().chem_controllers.contains_key(&1));
        assert_eq!(board.polled_chem_controllers(), vec![1]);
    });
}

#[test]
fn valve_bound_to_a_circuit_follows_it() {
    run(|board, _gw, _feed| async move {
        board.set_model("nxp").await.unwrap();
        let valve = board
            .valves()
            .set_valve(ValveUpdate {
                name: Some("Waterfall".into()),
                circuit: Some(6),
                ..Default::default()
            })
            .await
            .unwrap();

        board.circuits().set_state(6, true).await.unwrap();
        assert!(board.state_snapshot().valves[&valve.id].is_diverted);
        board.circuits().set_state(6, false).await.unwrap();
        assert!(!board.state_snapshot().valves[&valve.id].is_diverted);

        board.valves().delete_valve(valve.id).await.unwrap();
        assert!(!board.state_snapshot().valves.contains_key(&valve.id));
    });
}

#[test]
fn status_pass_realigns_valves() {
    run(|board, gw, _feed| async move {
        board.set_model("nxps").await.unwrap();
        board.circuits().set_state(1, true).await.unwrap();

        // Drift a valve behind the board's back.
        let intake = board
            .config_snapshot()
            .valves
            .values()
            .find(|v| v.is_intake)
            .map(|v| v.id)
            .unwrap();
        board.valves().set_valve_state(intake, false).await.unwrap();
        gw.clear_calls();

        board.process_status().await;
        assert!(board.state_snapshot().valves[&intake].is_diverted);
        assert_eq!(gw.valve_commands(), vec![(intake, true)]);
    });
}

// ── Heaters and bodies ────────────────────────────────────────

#[test]
fn heaters_are_virtual_and_update_heat_sources() {
    run(|board, gw, _feed| async move {
        board.set_model("nxp").await.unwrap();
        let heater = board
            .heaters()
            .set_heater(HeaterUpdate {
                heater_type: Some(HeaterType::Gas),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(heater.id, 256);
        assert!(heater.is_virtual);
        assert_eq!(heater.master, 1);
        assert!(gw.calls().contains(&GatewayCall::SetHeater(256)));

        let solar = board
            .heaters()
            .set_heater(HeaterUpdate {
                heater_type: Some(HeaterType::Solar),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(solar.id, 257);
        assert_eq!(
            board.state_snapshot().bodies[&1].heat_sources,
            vec![HeatSource::Off, HeatSource::Heater, HeatSource::Solar, HeatSource::SolarPref]
        );

        assert!(matches!(
            board
                .heaters()
                .set_heater(HeaterUpdate {
                    id: Some(4),
                    ..Default::default()
                })
                .await,
            Err(BoardError::InvalidId { .. })
        ));
        let zero = board
            .heaters()
            .set_heater(HeaterUpdate {
                id: Some(0),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(zero.id, 258);
    });
}

#[test]
fn removing_a_heater_resets_an_ineligible_heat_mode() {
    run(|board, _gw, _feed| async move {
        board.set_model("nxp").await.unwrap();
        board
            .heaters()
            .set_heater(HeaterUpdate {
                heater_type: Some(HeaterType::HeatPump),
                ..Default::default()
            })
            .await
            .unwrap();
        board
            .bodies()
            .set_body(BodyUpdate {
                id: 1,
                heat_mode: Some(HeatSource::HeatPump),
                ..Default::default()
            })
            .unwrap();

        board.heaters().delete_heater(256).await.unwrap();
        assert_eq!(board.config_snapshot().bodies[&1].heat_mode, HeatSource::Off);
        assert_eq!(board.state_snapshot().bodies[&1].heat_sources, vec![HeatSource::Off]);
        assert!(matches!(
            board.heaters().delete_heater(256).await,
            Err(BoardError::NotFound { .. })
        ));
    });
}

#[test]
fn body_updates_validate_heat_mode_and_existence() {
    run(|board, _gw, _feed| async move {
        board.set_model("nxp").await.unwrap();
        let bodies = board.bodies();

        let body = bodies
            .set_body(BodyUpdate {
                id: 1,
                set_point: Some(84),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(body.set_point, 84);
        assert_eq!(board.state_snapshot().bodies[&1].set_point, 84);

        assert!(matches!(
            bodies.set_body(BodyUpdate {
                id: 1,
                heat_mode: Some(HeatSource::Solar),
                ..Default::default()
            }),
            Err(BoardError::InvalidParameter(_))
        ));
        assert!(matches!(
            bodies.set_body(BodyUpdate {
                id: 2,
                ..Default::default()
            }),
            Err(BoardError::NotFound { .. })
        ));
    });
}

// ── Chemistry ─────────────────────────────────────────────────

#[test]
fn fully_configured_controllers_are_polled() {
    run(|board, gw, _feed| async move {
        board.set_model("nxp").await.unwrap();
        let chem = board.chem_controllers();

        let partial = chem
            .set_chem_controller(ChemControllerUpdate {
                chem_type: Some(ChemControllerType::IntelliChem),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(partial.id, 1);
        assert!(board.polled_chem_controllers().is_empty());

        chem.set_chem_controller(ChemControllerUpdate {
            id: Some(1),
            address: Some(144),
            ..Default::default()
        })
        .await
        .unwrap();
        assert_eq!(board.polled_chem_controllers(), vec![1]);

        gw.set_readings(ChemReadings {
            ph_level: Some(7.6),
            orp_level: Some(710),
            temperature: Some(82.0),
        });
        board.process_status().await;
        let readings = board.state_snapshot().chem_controllers[&1].readings;
        assert_eq!(readings.ph_level, Some(7.6));
        assert_eq!(readings.orp_level, Some(710));
        assert!(gw.calls().contains(&GatewayCall::PollChemController(1)));

        chem.delete_chem_controller(1).await.unwrap();
        assert!(board.polled_chem_controllers().is_empty());
    });
}

#[test]
fn chem_state_can_be_reported_directly() {
    run(|board, _gw, _feed| async move {
        board.set_model("nxp").await.unwrap();
        let chem = board.chem_controllers();
        chem.set_chem_controller(ChemControllerUpdate::default())
            .await
            .unwrap();

        let readings = ChemReadings {
            ph_level: Some(7.3),
            ..Default::default()
        };
        chem.set_chem_controller_state(1, readings).unwrap();
        assert_eq!(board.state_snapshot().chem_controllers[&1].readings, readings);
        assert!(matches!(
            chem.set_chem_controller_state(9, readings),
            Err(BoardError::NotFound { .. })
        ));
    });
}
