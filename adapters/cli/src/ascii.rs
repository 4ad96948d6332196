use std::fmt::Write as _;

use dustfield_core::CellCoord;
use dustfield_field::{query, Field};

const FILLED: char = '#';
const PERMANENT: char = '.';
const RESERVED: char = 'o';
const HELD: char = '+';
const OPEN: char = ' ';

/// Renders the field as one character per cell, one line per row.
pub(crate) fn render(field: &Field) -> String {
    let Some(layout) = query::layout(field) else {
        return String::new();
    };
    let size = layout.size();
    let now = query::now(field);
    let mut text = String::with_capacity(size.cell_count() + size.rows() as usize);

    for row in 0..size.rows() {
        for column in 0..size.columns() {
            let glyph = match query::cell_state(field, CellCoord::new(column, row)) {
                Some(cell) if cell.is_filled() => FILLED,
                Some(cell) if cell.keep_clear_refs > 0 => RESERVED,
                Some(cell) if cell.permanently_open => PERMANENT,
                Some(cell) if cell.held_until.is_some_and(|until| until > now) => HELD,
                _ => OPEN,
            };
            text.push(glyph);
        }
        let _ = writeln!(text);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustfield_core::Command;
    use dustfield_field as field;
    use glam::Vec2;

    #[test]
    fn renders_filled_and_carved_cells() {
        let mut field = Field::new();
        let mut events = Vec::new();
        for command in [
            Command::ConfigureGrid {
                columns: 3,
                rows: 2,
                cell_length: 1.0,
                origin: Vec2::ZERO,
            },
            Command::FillAll,
            Command::CarveDisk {
                center: CellCoord::new(0, 0),
                radius: 0,
                permanent: true,
            },
            Command::CarveDisk {
                center: CellCoord::new(2, 1),
                radius: 0,
                permanent: false,
            },
        ] {
            field::apply(&mut field, command, &mut events);
        }

        assert_eq!(render(&field), ".##\n## \n");
    }

    #[test]
    fn unconfigured_field_renders_nothing() {
        assert!(render(&Field::new()).is_empty());
    }
}
