use ckd_risk::{Feature, ScoredPatient, FEATURE_COUNT};
use eframe::egui::Ui;
use egui_plot::{Bar, BarChart, Legend, Plot};

use crate::color::generate_palette;

// ---------------------------------------------------------------------------
// Standardized feature chart (technical details)
// ---------------------------------------------------------------------------

/// One bar per feature: how many training standard deviations the patient
/// sits from the training mean.
pub fn standardized_chart(ui: &mut Ui, scored: &ScoredPatient) {
    let colors = generate_palette(FEATURE_COUNT);

    Plot::new("standardized_features")
        .legend(Legend::default())
        .height(260.0)
        .x_axis_label("Feature")
        .y_axis_label("Standardized value")
        .allow_boxed_zoom(false)
        .allow_drag(false)
        .allow_scroll(false)
        .allow_zoom(false)
        .show(ui, |plot_ui| {
            for (feature, color) in Feature::ALL.iter().zip(colors) {
                let i = feature.index();
                let bar = Bar::new(i as f64, scored.standardized[i])
                    .name(feature.column_name())
                    .width(0.7);
                let chart = BarChart::new(vec![bar])
                    .name(feature.input_key())
                    .color(color);
                plot_ui.bar_chart(chart);
            }
        });
}
