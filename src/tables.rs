use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    core::{
        bounds::ScenarioBounds,
        merit_order::Fleet,
        power_law::PowerLaw,
        scaling::ScalingPoint,
    },
    quantity::{energy::MegawattHours, power::Megawatts},
};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table
}

pub fn build_fleet_table(fleet: &Fleet) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Technology", "Marginal cost", "Capacity", "Cumulative"]);
    let mut cumulative = Megawatts::ZERO;
    for generator in fleet.generators() {
        cumulative += generator.capacity;
        table.add_row(vec![
            Cell::new(generator.technology),
            Cell::new(generator.marginal_cost).set_alignment(CellAlignment::Right),
            Cell::new(generator.capacity).set_alignment(CellAlignment::Right),
            Cell::new(cumulative).set_alignment(CellAlignment::Right).add_attribute(Attribute::Dim),
        ]);
    }
    table
}

/// Simulated and fitted peak per swept capacity.
pub fn build_scaling_table(points: &[ScalingPoint], fit: &PowerLaw) -> Table {
    let baseline = points.first().map_or(Megawatts::ZERO, |point| point.peak);

    let mut table = new_table();
    table.set_header(vec!["Capacity", "Peak", "Fitted", "Reduction"]);
    for point in points {
        let reduction = baseline - point.peak;
        table.add_row(vec![
            Cell::new(point.capacity).set_alignment(CellAlignment::Right),
            Cell::new(point.peak).set_alignment(CellAlignment::Right),
            if point.capacity > MegawattHours::ZERO {
                Cell::new(fit.evaluate(point.capacity)).set_alignment(CellAlignment::Right)
            } else {
                Cell::new("—").set_alignment(CellAlignment::Center).add_attribute(Attribute::Dim)
            },
            Cell::new(reduction).set_alignment(CellAlignment::Right).fg(
                if reduction > Megawatts::ZERO { Color::Green } else { Color::Reset },
            ),
        ]);
    }
    table
}

pub fn build_corridor_table(bounds: &[ScenarioBounds]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Capacity", "Optimistic", "Expected", "Pessimistic", "Width"]);
    for bounds in bounds {
        table.add_row(vec![
            Cell::new(bounds.capacity).set_alignment(CellAlignment::Right),
            Cell::new(bounds.optimistic).set_alignment(CellAlignment::Right).fg(Color::Green),
            Cell::new(bounds.expected).set_alignment(CellAlignment::Right),
            Cell::new(bounds.pessimistic).set_alignment(CellAlignment::Right).fg(Color::Red),
            Cell::new(bounds.pessimistic - bounds.optimistic)
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Dim),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fleet_table() {
        let table = build_fleet_table(&Fleet::toy().unwrap());
        assert_eq!(table.row_count(), 6);
        let rendered = table.to_string();
        assert!(rendered.contains("Gas (Peaker)"));
        assert!(rendered.contains("21000 MW"));
    }

    #[test]
    fn test_scaling_table() {
        let points = [(0.0, 20_000.0), (100.0, 19_500.0), (1000.0, 18_000.0)].map(
            |(capacity, peak)| ScalingPoint {
                capacity: MegawattHours::from(capacity),
                peak: Megawatts::from(peak),
            },
        );
        let fit = PowerLaw {
            scale: 10_000.0,
            exponent: 0.5,
            offset: Megawatts::from(17_000.0),
            rmse: Megawatts::ZERO,
        };
        let table = build_scaling_table(&points, &fit);
        assert_eq!(table.row_count(), 3);
        assert!(table.to_string().contains("2000 MW"));
    }

    #[test]
    fn test_corridor_table() {
        let bounds = ScenarioBounds {
            capacity: MegawattHours::from(500.0),
            optimistic: Megawatts::from(21_000.0),
            pessimistic: Megawatts::from(21_900.0),
            expected: Megawatts::from(21_450.0),
        };
        let table = build_corridor_table(&[bounds]);
        assert_eq!(table.row_count(), 1);
        assert!(table.to_string().contains("900 MW"));
    }
}
