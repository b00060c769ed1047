use eframe::egui;

use crate::state::AppState;
use crate::ui::panels;

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct CkdRiskApp {
    pub state: AppState,
}

impl CkdRiskApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for CkdRiskApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Bottom panel: disclaimer ----
        egui::TopBottomPanel::bottom("footer").show(ctx, |ui| {
            panels::footer(ui);
        });

        // ---- Left side panel: patient form ----
        egui::SidePanel::left("patient_form")
            .default_width(320.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::patient_form(ui, &mut self.state);
            });

        // ---- Central panel: result ----
        egui::CentralPanel::default().show(ctx, |ui| {
            panels::result_panel(ui, &self.state);
        });
    }
}
