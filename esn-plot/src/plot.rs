use plotters::prelude::*;

use super::Series;

/// Render a prediction-vs-teacher comparison chart to a png file.
pub fn plot(teacher: &Series, predictions: &Series, filename: &str, dims: (u32, u32)) {
    info!("n_teacher: {}, n_predictions: {}", teacher.len(), predictions.len());

    let ts_min = teacher[0].0;
    let ts_max = teacher[teacher.len() - 1].0;
    let mut value_min: f64 = teacher[0].1;
    let mut value_max: f64 = value_min;
    for v in teacher.iter().chain(predictions.iter()) {
        if v.1 < value_min {
            value_min = v.1;
        }
        if v.1 > value_max {
            value_max = v.1;
        }
    }
    info!("value_min: {}, value_max: {}", value_min, value_max);

    let root_area = BitMapBackend::new(filename, dims).into_drawing_area();
    root_area.fill(&WHITE).unwrap();
    let root_area = root_area.titled(filename, ("sans-serif", 20).into_font()).unwrap();

    let areas = root_area.split_evenly((1, 1));

    let mut cc0 = ChartBuilder::on(&areas[0])
        .margin(5)
        .set_all_label_area_size(50)
        .caption("values", ("sans-serif", 30).into_font().with_color(&BLACK))
        .build_cartesian_2d(ts_min..ts_max, value_min..value_max)
        .unwrap();
    cc0.configure_mesh()
        .x_labels(20)
        .y_labels(20)
        .x_label_formatter(&|v| format!("{:.0}", v))
        .y_label_formatter(&|v| format!("{:.4}", v))
        .draw()
        .unwrap();

    cc0.draw_series(LineSeries::new(teacher.clone(), &BLACK))
        .unwrap()
        .label("teacher")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLACK));
    cc0.draw_series(LineSeries::new(predictions.clone(), &GREEN))
        .unwrap()
        .label("prediction")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &GREEN));
    cc0.configure_series_labels().border_style(&BLACK).draw().unwrap();

    info!("successfully plotted to {}", filename);
}
