use std::path::Path;

use plotters::{
    prelude::*,
    style::text_anchor::{HPos, Pos, VPos},
};

use crate::{
    core::merit_order::{BASE_LOAD, Boundary, Fleet, PEAK_LOAD, Technology},
    prelude::*,
    quantity::power::Megawatts,
    render::{CAPTION_FONT, headroom, render},
};

const SIZE: (u32, u32) = (1500, 900);

const ANNOTATION_COLOR: RGBColor = RGBColor(0x80, 0x80, 0x80);

const fn color(technology: Technology) -> RGBColor {
    match technology {
        Technology::Renewables => GREEN,
        Technology::Nuclear => BLUE,
        Technology::Coal => BLACK,
        Technology::CombinedCycleGas => RGBColor(0xFF, 0xA5, 0x00),
        Technology::PeakerGas => RED,
        Technology::Oil => RGBColor(0x80, 0x00, 0x80),
    }
}

/// Stepped supply curve with one shaded block per generator and the annotated loads.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn draw(path: &Path, fleet: &Fleet) -> Result {
    let supply_curve = fleet.supply_curve();
    let max_price = fleet.max_price();
    let x_range = 0.0..(fleet.total_capacity() + Megawatts::from(500.0)).0;
    let y_range = headroom([max_price.0], 1.12);

    render(path, SIZE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption("Merit Order Supply Curve (Toy Fleet)", CAPTION_FONT)
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range, y_range.clone())?;
        chart
            .configure_mesh()
            .x_desc("Cumulative Capacity (MW)")
            .y_desc("Marginal Cost ($/MWh)")
            .light_line_style(&WHITE)
            .draw()?;

        let blocks = fleet.generators().iter().zip(supply_curve.edges.windows(2));
        chart.draw_series(blocks.clone().map(|(generator, edges)| {
            Rectangle::new(
                [(edges[0].0, 0.0), (edges[1].0, generator.marginal_cost.0)],
                color(generator.technology).mix(0.5).filled(),
            )
        }))?;

        let label_offset = max_price.0 * 0.02;
        chart.draw_series(blocks.map(|(generator, edges)| {
            Text::new(
                generator.technology.to_string(),
                (0.5 * (edges[0] + edges[1]).0, generator.marginal_cost.0 + label_offset),
                TextStyle::from(("sans-serif", 14.0).into_font())
                    .pos(Pos::new(HPos::Center, VPos::Bottom)),
            )
        }))?;

        // Step outline, holding the last price up to the last edge:
        let steps = supply_curve.edges.iter().enumerate().flat_map(|(i, edge)| {
            let before = supply_curve.prices.get(i.saturating_sub(1)).copied();
            let after = supply_curve.prices.get(i).copied().or(before);
            [before.unwrap_or_default(), after.unwrap_or_default()]
                .map(|price| (edge.0, price.0))
        });
        chart.draw_series(LineSeries::new(steps, BLACK.stroke_width(2)))?;

        for (demand, name) in [(BASE_LOAD, "Base Load"), (PEAK_LOAD, "Peak Load")] {
            let price = supply_curve.price_at(demand, Boundary::Right, None);
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(demand.0, y_range.start), (demand.0, y_range.end)],
                ANNOTATION_COLOR.stroke_width(1),
            )))?;
            chart.draw_series([Circle::new((demand.0, price.0), 5, ANNOTATION_COLOR.filled())])?;
            chart.draw_series(std::iter::once(Text::new(
                format!("{name} = {demand}, price ~{price}"),
                (demand.0 + 700.0, price.0 + 20.0),
                ("sans-serif", 14.0),
            )))?;
            debug!(%demand, %price, name, "annotated");
        }

        let peaker_index = fleet
            .generators()
            .iter()
            .position(|generator| generator.technology == Technology::PeakerGas);
        if let (Some(combined_cycle), Some(peaker), Some(cliff_edge)) = (
            fleet.find(Technology::CombinedCycleGas),
            fleet.find(Technology::PeakerGas),
            peaker_index.and_then(|index| supply_curve.edges.get(index)),
        ) {
            let cliff_price = 0.5 * (combined_cycle.marginal_cost + peaker.marginal_cost).0;
            chart.draw_series([Circle::new((cliff_edge.0, cliff_price), 6, BLACK.filled())])?;
            chart.draw_series(std::iter::once(Text::new(
                "Non-Linear Price Cliff",
                (cliff_edge.0 + 1200.0, cliff_price + 35.0),
                ("sans-serif", 16.0),
            )))?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    #[test]
    fn test_draw_toy_fleet() {
        let path = env::temp_dir().join(format!("merit-order-{}.png", std::process::id()));
        draw(&path, &Fleet::toy().unwrap()).unwrap();
        assert!(path.is_file());
        std::fs::remove_file(path).unwrap();
    }
}
