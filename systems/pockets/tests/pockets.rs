use std::time::Duration;

use dustfield_core::{CellCoord, Command};
use dustfield_field::{self as field, query, Field};
use dustfield_system_pockets::{CollectableId, CollectableNotice, Config, Pockets};
use glam::Vec2;

fn drive(field: &mut Field, commands: Vec<Command>) {
    let mut events = Vec::new();
    for command in commands {
        field::apply(field, command, &mut events);
    }
}

#[test]
fn pocket_stays_open_for_its_hold() {
    let mut field = Field::new();
    drive(
        &mut field,
        vec![
            Command::ConfigureGrid {
                columns: 6,
                rows: 6,
                cell_length: 1.0,
                origin: Vec2::ZERO,
            },
            Command::FillAll,
        ],
    );
    let layout = query::layout(&field).expect("grid configured");

    let mut pockets = Pockets::new(Config::new(1, Duration::from_secs(8)));
    let mut commands = Vec::new();
    pockets.handle(
        &[CollectableNotice::Spawned {
            id: CollectableId::new(1),
            position: Vec2::new(3.5, 3.5),
        }],
        &layout,
        &mut commands,
    );
    drive(&mut field, commands);

    let center = CellCoord::new(3, 3);
    assert!(!query::is_filled(&field, center), "pocket should be carved");
    assert_eq!(query::filled_count(&field), 31);

    let mut commands = Vec::new();
    pockets.handle(
        &[CollectableNotice::Collected {
            id: CollectableId::new(1),
        }],
        &layout,
        &mut commands,
    );
    assert!(commands.is_empty(), "collecting does not touch the field");

    drive(
        &mut field,
        vec![Command::Tick {
            dt: Duration::from_secs(5),
        }],
    );
    assert!(
        query::is_open_effective(&field, center),
        "hold should outlast the regrowth delay"
    );
    assert!(!query::is_filled(&field, center));

    drive(
        &mut field,
        vec![Command::Tick {
            dt: Duration::from_secs(3),
        }],
    );
    assert_eq!(query::filled_count(&field), 36);
}
