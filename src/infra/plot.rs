// ============================================================
// Layer 6 — Training Curves
// ============================================================
// Redraws <run_dir>/loss_f1_vs_epoch.png from the full history
// after every epoch: losses on the left panel, dev F1 on the
// right. Only available with the `plots` feature.

use std::path::Path;

use crate::infra::metrics::MetricsHistory;

pub const PLOT_FILE: &str = "loss_f1_vs_epoch.png";

#[cfg(feature = "plots")]
pub fn plot_history<P: AsRef<Path>>(
    path: P,
    history: &MetricsHistory,
) -> Result<(), Box<dyn std::error::Error>> {
    use plotters::prelude::*;

    let root = BitMapBackend::new(path.as_ref(), (1024, 420)).into_drawing_area();
    root.fill(&WHITE)?;
    let (left, right) = root.split_horizontally(512);

    let finite = |series: Vec<(usize, f64)>| -> Vec<(f32, f32)> {
        series
            .into_iter()
            .filter(|(_, v)| v.is_finite())
            .map(|(e, v)| (e as f32, v as f32))
            .collect()
    };
    let train = finite(history.train_loss());
    let dev = finite(history.dev_loss());
    let f1 = finite(history.dev_f1());

    let x_max = history.len().max(2) as f32;
    let loss_max = train
        .iter()
        .chain(dev.iter())
        .map(|p| p.1)
        .fold(0.0f32, f32::max)
        .max(1e-3)
        * 1.1;

    let mut chart = ChartBuilder::on(&left)
        .margin(20)
        .caption("Loss", ("sans-serif", 22))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(1.0f32..x_max, 0.0f32..loss_max)?;
    chart.configure_mesh().x_desc("Epoch").y_desc("Loss").draw()?;
    chart
        .draw_series(LineSeries::new(train, &BLUE))?
        .label("train_loss")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.filled()));
    chart
        .draw_series(LineSeries::new(dev, &RED))?
        .label("dev_loss")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.filled()));
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    let mut chart = ChartBuilder::on(&right)
        .margin(20)
        .caption("Dev F1", ("sans-serif", 22))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(1.0f32..x_max, 0.0f32..1.0f32)?;
    chart.configure_mesh().x_desc("Epoch").y_desc("F1").draw()?;
    chart
        .draw_series(LineSeries::new(f1.clone(), &GREEN))?
        .label("dev_f1")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], GREEN.filled()));
    chart.draw_series(f1.into_iter().map(|p| Circle::new(p, 3, GREEN.filled())))?;
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(not(feature = "plots"))]
pub fn plot_history<P: AsRef<Path>>(
    _path: P,
    _history: &MetricsHistory,
) -> Result<(), Box<dyn std::error::Error>> {
    Err("plots feature is not enabled".into())
}
