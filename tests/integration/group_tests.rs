//! Circuit groups, light groups and timed light sequences.

use std::time::Duration;

use crate::mock_gateway::{MockGateway, run, sleep_ms};

use poolboard::board::Board;
use poolboard::commands::circuits::CircuitUpdate;
use poolboard::commands::groups::{
    CircuitGroupUpdate, GroupMemberUpdate, LightGroupMemberUpdate, LightGroupUpdate,
};
use poolboard::equipment::{CircuitFunction, DesiredState, LightAction, LightTheme};
use poolboard::error::BoardError;

/// nxp board plus aux circuits 2, 3 and 4.
async fn board_with_aux(board: &Board<MockGateway>) {
    board.set_model("nxp").await.unwrap();
    for _ in 0..3 {
        board
            .circuits()
            .set_circuit(CircuitUpdate {
                function: Some(CircuitFunction::Light),
                ..Default::default()
            })
            .await
            .unwrap();
    }
}

fn member(circuit: u16, desired: DesiredState) -> GroupMemberUpdate {
    GroupMemberUpdate {
        circuit: Some(circuit),
        desired_state: Some(desired),
    }
}

fn light_member(circuit: u16) -> LightGroupMemberUpdate {
    LightGroupMemberUpdate {
        circuit: Some(circuit),
        ..Default::default()
    }
}

#[test]
fn group_state_fans_out_to_every_member() {
    run(|board, gw, _feed| async move {
        board_with_aux(&board).await;
        let group = board
            .groups()
            .set_circuit_group(CircuitGroupUpdate {
                name: Some("Deck".into()),
                members: Some(vec![member(2, DesiredState::On), member(3, DesiredState::On)]),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(group.id, 193);
        gw.clear_calls();

        board.circuits().set_state(193, true).await.unwrap();
        let state = board.state_snapshot();
        assert!(state.circuits[&2].is_on);
        assert!(state.circuits[&3].is_on);
        assert!(state.circuit_groups[&193].is_on);
        let mut relays = gw.relay_commands();
        relays.sort_unstable();
        assert_eq!(relays, vec![(2, true), (3, true)]);

        board.circuits().set_state(193, false).await.unwrap();
        assert!(!board.state_snapshot().circuit_groups[&193].is_on);
    });
}

#[test]
fn member_commands_are_issued_before_any_completes() {
    run(|board, gw, _feed| async move {
        board_with_aux(&board).await;
        board
            .groups()
            .set_circuit_group(CircuitGroupUpdate {
                members: Some(vec![
                    member(2, DesiredState::On),
                    member(3, DesiredState::On),
                    member(4, DesiredState::On),
                ]),
                ..Default::default()
            })
            .unwrap();
        gw.set_relay_delay(Duration::from_millis(30));

        let started = std::time::Instant::now();
        board.groups().set_group_state(193, true).await.unwrap();
        // Three serial commands would take at least 90 ms.
        assert!(started.elapsed() < Duration::from_millis(85));
        assert_eq!(gw.relay_commands().len(), 3);
    });
}

#[test]
fn first_member_failure_is_reported_without_rollback() {
    run(|board, gw, _feed| async move {
        board_with_aux(&board).await;
        board
            .groups()
            .set_circuit_group(CircuitGroupUpdate {
                members: Some(vec![member(2, DesiredState::On), member(3, DesiredState::On)]),
                ..Default::default()
            })
            .unwrap();
        gw.fail_circuit(3);

        let err = board.groups().set_group_state(193, true).await.unwrap_err();
        assert!(matches!(err, BoardError::HardwareFailure(_)));
        let state = board.state_snapshot();
        assert!(state.circuits[&2].is_on);
        assert!(!state.circuits[&3].is_on);
        assert!(!board.is_status_suspended());
    });
}

#[test]
fn aggregate_respects_desired_states() {
    run(|board, _gw, _feed| async move {
        board_with_aux(&board).await;
        board
            .groups()
            .set_circuit_group(CircuitGroupUpdate {
                members: Some(vec![member(2, DesiredState::On), member(3, DesiredState::Ignore)]),
                ..Default::default()
            })
            .unwrap();

        board.circuits().set_state(3, true).await.unwrap();
        assert!(!board.state_snapshot().circuit_groups[&193].is_on);

        board.circuits().set_state(2, true).await.unwrap();
        assert!(board.state_snapshot().circuit_groups[&193].is_on);
    });
}

#[test]
fn member_list_updates_merge_by_index() {
    run(|board, _gw, _feed| async move {
        board_with_aux(&board).await;
        let groups = board.groups();
        groups
            .set_circuit_group(CircuitGroupUpdate {
                members: Some(vec![
                    member(2, DesiredState::Off),
                    member(3, DesiredState::On),
                    member(4, DesiredState::On),
                ]),
                ..Default::default()
            })
            .unwrap();

        let updated = groups
            .set_circuit_group(CircuitGroupUpdate {
                id: Some(193),
                members: Some(vec![GroupMemberUpdate {
                    circuit: None,
                    desired_state: Some(DesiredState::On),
                }]),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.members.len(), 1);
        assert_eq!(updated.members[0].circuit, 2);
        assert_eq!(updated.members[0].desired_state, DesiredState::On);

        let too_many = vec![member(2, DesiredState::On); 17];
        let err = groups
            .set_circuit_group(CircuitGroupUpdate {
                id: Some(193),
                members: Some(too_many),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, BoardError::InvalidParameter(_)));
    });
}

#[test]
fn circuit_and_light_groups_share_one_range() {
    run(|board, _gw, _feed| async move {
        board_with_aux(&board).await;
        let groups = board.groups();
        let cg = groups.set_circuit_group(CircuitGroupUpdate::default()).unwrap();
        let lg = groups.set_light_group(LightGroupUpdate::default()).unwrap();
        assert_eq!(cg.id, 193);
        assert_eq!(lg.id, 194);

        let err = groups
            .set_light_group(LightGroupUpdate {
                id: Some(193),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, BoardError::InvalidId { .. }));

        let err = groups
            .set_circuit_group(CircuitGroupUpdate {
                id: Some(12),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, BoardError::InvalidId { .. }));
    });
}

#[test]
fn theme_turns_members_on_and_sequence_reverts_to_idle() {
    run(|board, gw, _feed| async move {
        board_with_aux(&board).await;
        let lg = board
            .groups()
            .set_light_group(LightGroupUpdate {
                members: Some(vec![light_member(2), light_member(3)]),
                ..Default::default()
            })
            .unwrap();
        board.circuits().set_state(2, true).await.unwrap();
        gw.clear_calls();

        board
            .groups()
            .set_light_group_theme(lg.id, LightTheme::Party.code())
            .await
            .unwrap();
        // Only the member that was off gets commanded.
        assert_eq!(gw.relay_commands(), vec![(3, true)]);

        let state = board.state_snapshot();
        let group = &state.light_groups[&lg.id];
        assert!(group.is_on);
        assert_eq!(group.lighting_theme, Some(LightTheme::Party));
        assert_eq!(group.action, LightAction::Color);
        assert_eq!(
            board.config_snapshot().light_groups[&lg.id].lighting_theme,
            Some(LightTheme::Party)
        );

        sleep_ms(80).await;
        assert_eq!(board.state_snapshot().light_groups[&lg.id].action, LightAction::Idle);
    });
}

#[test]
fn off_theme_turns_members_off_without_a_sequence() {
    run(|board, _gw, _feed| async move {
        board_with_aux(&board).await;
        let lg = board
            .groups()
            .set_light_group(LightGroupUpdate {
                members: Some(vec![light_member(2), light_member(3)]),
                ..Default::default()
            })
            .unwrap();
        board.groups().set_group_state(lg.id, true).await.unwrap();
        assert!(board.state_snapshot().light_groups[&lg.id].is_on);

        board.groups().set_light_group_theme(lg.id, 0).await.unwrap();
        let state = board.state_snapshot();
        assert!(!state.circuits[&2].is_on);
        assert!(!state.circuits[&3].is_on);
        assert!(!state.light_groups[&lg.id].is_on);
        assert_eq!(state.light_groups[&lg.id].action, LightAction::Idle);

        assert!(matches!(
            board.groups().set_light_group_theme(lg.id, 99).await,
            Err(BoardError::InvalidParameter(_))
        ));
    });
}

#[test]
fn new_sequence_cancels_the_previous_one() {
    run(|board, _gw, _feed| async move {
        board_with_aux(&board).await;
        let lg = board.groups().set_light_group(LightGroupUpdate::default()).unwrap();
        let groups = board.groups();

        groups.sequence_light_group(lg.id, LightAction::Sync).unwrap();
        sleep_ms(25).await;
        groups.sequence_light_group(lg.id, LightAction::Swim).unwrap();
        // The first sequence would have reverted at 40 ms.
        sleep_ms(25).await;
        assert_eq!(board.state_snapshot().light_groups[&lg.id].action, LightAction::Swim);

        sleep_ms(50).await;
        assert_eq!(board.state_snapshot().light_groups[&lg.id].action, LightAction::Idle);
    });
}

#[test]
fn light_group_attribs_assign_positions() {
    run(|board, _gw, _feed| async move {
        board_with_aux(&board).await;
        let lg = board.groups().set_light_group(LightGroupUpdate::default()).unwrap();
        let updated = board
            .groups()
            .set_light_group_attribs(
                lg.id,
                &[
                    LightGroupMemberUpdate {
                        circuit: Some(4),
                        color: Some(2),
                        ..Default::default()
                    },
                    light_member(2),
                ],
            )
            .unwrap();
        assert_eq!(updated.members.len(), 2);
        assert_eq!(updated.members[0].circuit, 4);
        assert_eq!(updated.members[0].color, 2);
        assert_eq!(updated.members[0].position, 1);
        assert_eq!(updated.members[1].position, 2);

        assert!(matches!(
            board.groups().set_light_group_attribs(lg.id, &[light_member(0)]),
            Err(BoardError::InvalidParameter(_))
        ));
    });
}

#[test]
fn deleting_groups() {
    run(|board, _gw, _feed| async move {
        board_with_aux(&board).await;
        let groups = board.groups();
        let cg = groups.set_circuit_group(CircuitGroupUpdate::default()).unwrap();
        let lg = groups.set_light_group(LightGroupUpdate::default()).unwrap();

        groups.delete_circuit_group(cg.id).unwrap();
        groups.delete_light_group(lg.id).unwrap();
        let state = board.state_snapshot();
        assert!(state.circuit_groups.is_empty());
        assert!(state.light_groups.is_empty());

        assert!(matches!(
            groups.delete_light_group(lg.id),
            Err(BoardError::NotFound { .. })
        ));
        assert!(matches!(
            board.circuits().set_state(cg.id, true).await,
            Err(BoardError::NotFound { .. })
        ));
    });
}
