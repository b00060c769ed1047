use ckd_risk::{Feature, ScoredPatient, Sex};
use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use super::plot;
use crate::color::risk_color;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – patient form
// ---------------------------------------------------------------------------

/// Render the patient form. All fields are required and bounded.
pub fn patient_form(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Patient");
    ui.label(RichText::new("Fill in every field to obtain a risk assessment.").italics());
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.strong("Demographics");
            ui.label(Feature::Age.display_label());
            ui.add(egui::Slider::new(&mut state.form.age, 18..=120).suffix(" years"));
            field_error(ui, state, Feature::Age);

            ui.label(Feature::Sex.display_label());
            ui.horizontal(|ui: &mut Ui| {
                ui.radio_value(&mut state.form.sex, Sex::Male, Sex::Male.as_str());
                ui.radio_value(&mut state.form.sex, Sex::Female, Sex::Female.as_str());
            });
            field_error(ui, state, Feature::Sex);

            number_field(ui, Feature::Bmi, &mut state.form.bmi, 0.1);
            field_error(ui, state, Feature::Bmi);
            ui.separator();

            ui.strong("Clinical findings");
            yes_no_field(ui, Feature::Hypertension, &mut state.form.hypertension);
            yes_no_field(ui, Feature::Diabetes, &mut state.form.diabetes);
            yes_no_field(ui, Feature::Edema, &mut state.form.edema);
            ui.separator();

            ui.strong("Biomarkers");
            number_field(ui, Feature::Gfr, &mut state.form.gfr, 0.1);
            field_error(ui, state, Feature::Gfr);
            number_field(ui, Feature::Creatinine, &mut state.form.creatinine, 0.1);
            field_error(ui, state, Feature::Creatinine);
            number_field(ui, Feature::Acr, &mut state.form.acr, 1.0);
            field_error(ui, state, Feature::Acr);
            ui.separator();

            ui.strong("Treatments");
            ui.label(Feature::NsaidScore.display_label());
            let range = Feature::NsaidScore.accepted_range();
            ui.add(
                egui::Slider::new(&mut state.form.nsaid_score, range)
                    .step_by(0.1)
                    .fixed_decimals(1),
            )
            .on_hover_text("0 = none · 3 = moderate · 6 = heavy · 9.9 = very intensive use");
            field_error(ui, state, Feature::NsaidScore);
            ui.add_space(8.0);

            ui.horizontal(|ui: &mut Ui| {
                let predict = egui::Button::new(RichText::new("Predict risk").strong());
                if ui.add(predict).clicked() {
                    state.submit();
                }
                if ui.button("Reset").clicked() {
                    state.reset_form();
                }
            });
        });
}

fn number_field(ui: &mut Ui, feature: Feature, value: &mut f64, speed: f64) {
    let range = feature.accepted_range();
    ui.horizontal(|ui: &mut Ui| {
        ui.label(feature.display_label());
        ui.add(
            egui::DragValue::new(value)
                .range(range)
                .speed(speed)
                .fixed_decimals(if speed < 1.0 { 1 } else { 0 }),
        );
    });
}

fn yes_no_field(ui: &mut Ui, feature: Feature, value: &mut bool) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label(feature.display_label());
        ui.radio_value(value, false, "No");
        ui.radio_value(value, true, "Yes");
    });
}

fn field_error(ui: &mut Ui, state: &AppState, feature: Feature) {
    if let Some(err) = state.field_error(feature) {
        ui.label(RichText::new(err.to_string()).color(Color32::RED).small());
    }
}

// ---------------------------------------------------------------------------
// Central panel – prediction
// ---------------------------------------------------------------------------

/// Render the last prediction, or the reason it was rejected.
pub fn result_panel(ui: &mut Ui, state: &AppState) {
    let scored = match &state.outcome {
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Fill in the form and press “Predict risk”");
            });
            return;
        }
        Some(Err(e)) => {
            ui.heading("Assessment");
            ui.separator();
            ui.label(RichText::new(e.to_string()).color(Color32::RED).strong());
            ui.label("Please check all inputs and try again.");
            return;
        }
        Some(Ok(scored)) => scored,
    };

    let result = scored.result;
    let recommendation = result.recommendation();
    let color = risk_color(result.probability);

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("Assessment");
            ui.separator();
            ui.label(RichText::new(&recommendation.headline).size(22.0).strong().color(color));
            ui.add(
                egui::ProgressBar::new(result.confidence() as f32)
                    .fill(color)
                    .text("Risk level"),
            );
            ui.add_space(8.0);

            ui.strong("Recommendations");
            for action in recommendation.actions {
                ui.label(format!("• {action}"));
            }
            ui.add_space(8.0);

            egui::CollapsingHeader::new("Technical details")
                .default_open(false)
                .show(ui, |ui: &mut Ui| {
                    feature_table(ui, scored);
                    ui.add_space(8.0);
                    plot::standardized_chart(ui, scored);
                });
        });
}

fn feature_table(ui: &mut Ui, scored: &ScoredPatient) {
    TableBuilder::new(ui)
        .striped(true)
        .vscroll(false)
        .column(Column::auto().at_least(160.0))
        .column(Column::auto().at_least(80.0))
        .column(Column::remainder())
        .header(20.0, |mut header| {
            header.col(|ui| {
                ui.strong("Feature");
            });
            header.col(|ui| {
                ui.strong("Value");
            });
            header.col(|ui| {
                ui.strong("Standardized");
            });
        })
        .body(|mut body| {
            for (feature, value) in scored.features.iter() {
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(feature.column_name());
                    });
                    row.col(|ui| {
                        ui.label(format!("{value}"));
                    });
                    row.col(|ui| {
                        ui.label(format!("{:+.3}", scored.standardized[feature.index()]));
                    });
                });
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Load models from folder…").clicked() {
                open_models_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        ui.label(format!(
            "Models: {} ({} trees)",
            state.settings.models_dir.display(),
            state.artifacts.classifier().trees().len()
        ));

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

/// Render the usage disclaimer.
pub fn footer(ui: &mut Ui) {
    ui.label(
        RichText::new(
            "For use by healthcare professionals. Results must be interpreted \
             within an overall clinical context.",
        )
        .small()
        .italics(),
    );
}

// ---------------------------------------------------------------------------
// Folder dialog
// ---------------------------------------------------------------------------

pub fn open_models_dialog(state: &mut AppState) {
    let folder = rfd::FileDialog::new()
        .set_title("Select a models folder")
        .set_directory(&state.settings.models_dir)
        .pick_folder();

    if let Some(dir) = folder {
        let mut settings = state.settings.clone();
        settings.models_dir = dir;
        state.reload_artifacts(settings);
    }
}
