//! The monitor GUI: connect page, settings form, and telemetry plot tabs.
//!
//! The window starts on a connect page until both flowgraph controllers are
//! up. After that a top strip carries the PHY and path-loss-model switches
//! and the central area shows tabbed plots. Telemetry arrives through mpsc
//! channels fed by the UDP listener threads; once per plot interval the
//! current rates, modelled path loss, and position are sampled into rolling
//! series.

use std::net::UdpSocket;
use std::sync::mpsc::{self, Receiver};
use std::time::Instant;

use eframe::egui;
use egui::Color32;
use egui_plot::{Line, Plot, PlotPoints};
use tracing::{error, info};

use crate::config::MonitorConfig;
use crate::pathloss::{self, PathLossModel};
use crate::phy::{Phy, PhyController};
use crate::series::SegmentedSeries;
use crate::stats::DeliveryStats;
use crate::telemetry::{
    spawn_counter_listener, spawn_position_listener, CounterKey, PositionUpdate,
};

/// Samples shown in the full-width plots (two minutes at the default interval).
const WIDE_PLOT_SAMPLES: usize = 120;
/// Samples shown in the overview plots.
const SMALL_PLOT_SAMPLES: usize = 60;

/// Altitude the reference path-loss curves are evaluated at. At ground level
/// the two-ray geometry degenerates, so the reference uses a typical flight
/// altitude instead.
const REFERENCE_ALTITUDE_M: f64 = 50.0;

/// Line color per PHY segment (index = [`Phy::index`]).
const PHY_COLORS: [Color32; 2] = [
    Color32::from_rgb(27, 158, 119),
    Color32::from_rgb(217, 95, 2),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Overview,
    DeliveryRate,
    PathLoss,
    Position,
    Settings,
}

/// One numeric input of the settings form. `ok` drives the red highlight
/// after a failed apply.
struct Field {
    label: &'static str,
    text: String,
    ok: bool,
}

impl Field {
    fn new(label: &'static str, value: f64) -> Self {
        Self {
            label,
            text: format!("{value}"),
            ok: true,
        }
    }

    /// Parse the field, remembering validity. `check` rejects out-of-range
    /// values (e.g. negative gains).
    fn parse(&mut self, check: impl Fn(f64) -> bool) -> Option<f64> {
        match self.text.trim().parse::<f64>() {
            Ok(v) if check(v) => {
                self.ok = true;
                Some(v)
            }
            _ => {
                self.ok = false;
                None
            }
        }
    }

    fn show(&mut self, ui: &mut egui::Ui) {
        ui.label(self.label);
        let mut edit = egui::TextEdit::singleline(&mut self.text).desired_width(80.0);
        if !self.ok {
            edit = edit.text_color(Color32::RED);
        }
        ui.add(edit);
        ui.end_row();
    }
}

/// Per-PHY column of the settings form.
struct PhyForm {
    rx_gain: Field,
    tx_gain: Field,
    rx_offset_mhz: Field,
    tx_offset_mhz: Field,
    sample_rate_msps: Field,
}

impl PhyForm {
    fn from_defaults(radio: &crate::config::RadioDefaults) -> Self {
        Self {
            rx_gain: Field::new("RX gain (dB)", radio.rx_gain),
            tx_gain: Field::new("TX gain (dB)", radio.tx_gain),
            rx_offset_mhz: Field::new("RX offset (MHz)", radio.rx_offset_mhz),
            tx_offset_mhz: Field::new("TX offset (MHz)", radio.tx_offset_mhz),
            sample_rate_msps: Field::new("Sample rate (MS/s)", radio.sample_rate_msps),
        }
    }

    /// Parsed values, or `None` with the offending fields marked.
    fn parse(&mut self) -> Option<PhyFormValues> {
        let rx_gain = self.rx_gain.parse(|v| v >= 0.0);
        let tx_gain = self.tx_gain.parse(|v| v >= 0.0);
        let rx_offset = self.rx_offset_mhz.parse(|_| true);
        let tx_offset = self.tx_offset_mhz.parse(|_| true);
        let sample_rate = self.sample_rate_msps.parse(|v| v > 0.0);
        Some(PhyFormValues {
            rx_gain: rx_gain?,
            tx_gain: tx_gain?,
            rx_offset: rx_offset? * 1e6,
            tx_offset: tx_offset? * 1e6,
            sample_rate: sample_rate? * 1e6,
        })
    }
}

#[derive(Clone, Copy)]
struct PhyFormValues {
    rx_gain: f64,
    tx_gain: f64,
    rx_offset: f64,
    tx_offset: f64,
    sample_rate: f64,
}

/// The eframe application.
pub struct MonitorApp {
    config: MonitorConfig,
    rx_counters: Receiver<CounterKey>,
    rx_positions: Receiver<PositionUpdate>,

    uav: Option<PhyController>,
    ground: Option<PhyController>,
    connect_error: Option<String>,
    uav_url: String,
    ground_url: String,

    selected_phy: Phy,
    selected_model: PathLossModel,
    chanem_socket: Option<UdpSocket>,
    status: Option<String>,

    stats: DeliveryStats,
    /// UAV position relative to the station antenna (z already corrected by
    /// the station height).
    position: [f64; 3],
    orientation: [f32; 3],

    tab: Tab,
    wlan_form: PhyForm,
    zigbee_form: PhyForm,

    last_sample: Instant,
    rate_ag: SegmentedSeries,
    rate_ga: SegmentedSeries,
    rate_combined: SegmentedSeries,
    pl_free_space: SegmentedSeries,
    pl_two_ray: SegmentedSeries,
    distance: SegmentedSeries,
    height: SegmentedSeries,

    reference_range_m: f64,
    reference_free_space: Vec<[f64; 2]>,
    reference_two_ray: Vec<[f64; 2]>,
}

impl MonitorApp {
    pub fn new(
        config: MonitorConfig,
        rx_counters: Receiver<CounterKey>,
        rx_positions: Receiver<PositionUpdate>,
    ) -> Self {
        let chanem_socket = match UdpSocket::bind("0.0.0.0:0") {
            Ok(s) => Some(s),
            Err(e) => {
                error!("cannot create channel-emulator socket: {e}");
                None
            }
        };
        let mut app = Self {
            uav_url: config.uav.flowgraph_url.clone(),
            ground_url: config.ground.flowgraph_url.clone(),
            wlan_form: PhyForm::from_defaults(&config.radio),
            zigbee_form: PhyForm::from_defaults(&config.radio),
            stats: DeliveryStats::new(config.rate_window()),
            rx_counters,
            rx_positions,
            uav: None,
            ground: None,
            connect_error: None,
            selected_phy: Phy::Wlan,
            selected_model: PathLossModel::FreeSpace,
            chanem_socket,
            status: None,
            position: [0.0; 3],
            orientation: [0.0; 3],
            tab: Tab::Overview,
            last_sample: Instant::now(),
            rate_ag: SegmentedSeries::new(WIDE_PLOT_SAMPLES),
            rate_ga: SegmentedSeries::new(WIDE_PLOT_SAMPLES),
            rate_combined: SegmentedSeries::new(SMALL_PLOT_SAMPLES),
            pl_free_space: SegmentedSeries::new(WIDE_PLOT_SAMPLES),
            pl_two_ray: SegmentedSeries::new(WIDE_PLOT_SAMPLES),
            distance: SegmentedSeries::new(WIDE_PLOT_SAMPLES),
            height: SegmentedSeries::new(WIDE_PLOT_SAMPLES),
            reference_range_m: 1000.0,
            reference_free_space: Vec::new(),
            reference_two_ray: Vec::new(),
            config,
        };
        app.recompute_reference();
        app
    }

    fn connected(&self) -> bool {
        self.uav.is_some() && self.ground.is_some()
    }

    // ── Data path ───────────────────────────────────────────────────────────

    /// Drain the telemetry channels into the stats window and position state.
    fn ingest(&mut self) {
        let now = Instant::now();
        while let Ok(key) = self.rx_counters.try_recv() {
            self.stats.record(key, now);
        }
        while let Ok(p) = self.rx_positions.try_recv() {
            self.position = [
                p.x as f64,
                p.y as f64,
                p.z as f64 - self.config.station_height_m,
            ];
            self.orientation = [p.roll, p.pitch, p.yaw];
        }
    }

    /// Once per plot interval, append one sample to every rolling series.
    fn sample_plots(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.last_sample) < self.config.plot_interval() {
            return;
        }
        self.last_sample = now;

        let seg = self.selected_phy.index() as u8;
        let ag = self.stats.air_to_ground(now);
        let ga = self.stats.ground_to_air(now);
        self.rate_ag.push(ag, seg);
        self.rate_ga.push(ga, seg);
        self.rate_combined.push((ag + ga) / 2.0, seg);

        let [x, y, z] = self.position;
        let lambda = self.config.wavelength();
        let d = pathloss::distance(x, y, z);
        self.pl_free_space.push(pathloss::free_space(d, lambda), 0);
        self.pl_two_ray.push(
            pathloss::flat_earth_two_ray(x, y, z, self.config.station_height_m, lambda),
            0,
        );
        self.distance.push(d, 0);
        self.height.push(z, 0);
    }

    // ── Control actions ─────────────────────────────────────────────────────

    /// Build both PHY controllers. A failure leaves the app on the connect
    /// page with the error shown; nothing is retried automatically.
    fn connect(&mut self) {
        self.connect_error = None;
        let uav_cfg = self.config.phy_config(&self.config.uav);
        let ground_cfg = self.config.phy_config(&self.config.ground);
        let uav = match PhyController::connect(self.uav_url.clone(), uav_cfg) {
            Ok(c) => c,
            Err(e) => {
                error!("connecting UAV flowgraph: {e}");
                self.connect_error = Some(format!("UAV flowgraph: {e}"));
                return;
            }
        };
        let ground = match PhyController::connect(self.ground_url.clone(), ground_cfg) {
            Ok(c) => c,
            Err(e) => {
                error!("connecting ground flowgraph: {e}");
                self.connect_error = Some(format!("Ground flowgraph: {e}"));
                return;
            }
        };
        info!("connected to both flowgraphs");
        self.uav = Some(uav);
        self.ground = Some(ground);
        self.select_model(PathLossModel::FreeSpace);
    }

    /// Switch both flowgraphs to `phy`. The selection shown in the GUI only
    /// moves when every controller took the switch, so a failed switch keeps
    /// the radio buttons and segment colors on the PHY that is still routed.
    fn change_phy(&mut self, phy: Phy) {
        self.status = None;
        let mut switched = true;
        for ctrl in [self.uav.as_mut(), self.ground.as_mut()].into_iter().flatten() {
            if let Err(e) = ctrl.select_phy(phy) {
                error!("selecting {}: {e}", phy.label());
                self.status = Some(format!("PHY switch failed: {e}"));
                switched = false;
            }
        }
        if switched {
            self.selected_phy = phy;
        }
    }

    /// Tell the channel emulator which path-loss model to apply.
    fn select_model(&mut self, model: PathLossModel) {
        self.selected_model = model;
        let Some(socket) = &self.chanem_socket else {
            return;
        };
        let payload = model.index().to_string();
        if let Err(e) = socket.send_to(payload.as_bytes(), &self.config.chanem_addr) {
            error!(
                "sending path-loss selection to {}: {e}",
                self.config.chanem_addr
            );
            self.status = Some(format!("Path-loss selection failed: {e}"));
        }
    }

    /// Validate the settings form and push it into both controllers, then
    /// re-apply the current PHY so the values take effect.
    fn apply_settings(&mut self) {
        let wlan = self.wlan_form.parse();
        let zigbee = self.zigbee_form.parse();
        let (Some(wlan), Some(zigbee)) = (wlan, zigbee) else {
            self.status = Some("Invalid input; check the highlighted fields.".to_string());
            return;
        };
        self.status = None;

        for (ctrl, mirror) in [(self.uav.as_mut(), false), (self.ground.as_mut(), true)] {
            let Some(ctrl) = ctrl else { continue };
            let sign = if mirror { -1.0 } else { 1.0 };
            for (phy, v) in [(Phy::Wlan, wlan), (Phy::Zigbee, zigbee)] {
                ctrl.set_rx_gain_config(phy, v.rx_gain);
                ctrl.set_tx_gain_config(phy, v.tx_gain);
                ctrl.set_sample_rate_config(phy, v.sample_rate);
                ctrl.set_rx_offset_config(phy, sign * v.rx_offset);
                ctrl.set_tx_offset_config(phy, -sign * v.tx_offset);
            }
            let current = ctrl.current_phy();
            if let Err(e) = ctrl.select_phy(current) {
                error!("re-applying configuration: {e}");
                self.status = Some(format!("Apply failed: {e}"));
            }
        }
    }

    fn restore_settings(&mut self) {
        self.wlan_form = PhyForm::from_defaults(&self.config.radio);
        self.zigbee_form = PhyForm::from_defaults(&self.config.radio);
    }

    fn recompute_reference(&mut self) {
        let lambda = self.config.wavelength();
        let station_z = self.config.station_height_m;
        let n = 100;
        self.reference_free_space = (0..=n)
            .map(|i| {
                let d = i as f64 / n as f64 * self.reference_range_m;
                [
                    d,
                    pathloss::free_space(
                        pathloss::distance(d, 0.0, REFERENCE_ALTITUDE_M),
                        lambda,
                    ),
                ]
            })
            .collect();
        self.reference_two_ray = (0..=n)
            .map(|i| {
                let d = i as f64 / n as f64 * self.reference_range_m;
                [
                    d,
                    pathloss::flat_earth_two_ray(d, 0.0, REFERENCE_ALTITUDE_M, station_z, lambda),
                ]
            })
            .collect();
    }

    // ── Rendering ───────────────────────────────────────────────────────────

    /// Draw one rolling series. `window` trims the visible sample count so an
    /// overview plot can show the tail of a wide series.
    fn series_plot(
        &self,
        ui: &mut egui::Ui,
        id: &str,
        series: &SegmentedSeries,
        window: usize,
        y_range: (f64, f64),
        y_label: &str,
        height: f32,
    ) {
        let interval_s = self.config.plot_interval_ms as f64 / 1000.0;
        let x_min = -(window as f64 - 1.0);
        let pad = 0.05 * (y_range.1 - y_range.0);
        let plot = Plot::new(id.to_string())
            .allow_scroll(false)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_boxed_zoom(false)
            .include_x(x_min)
            .include_x(0.0)
            .include_y(y_range.0 - pad)
            .include_y(y_range.1 + pad)
            .y_axis_label(y_label)
            .x_axis_formatter(move |x, _range| format!("{:.0} s", x.value * interval_s))
            .height(height);
        plot.show(ui, |plot_ui| {
            for (i, (seg, points)) in series.segments().into_iter().enumerate() {
                let visible: Vec<[f64; 2]> = points
                    .into_iter()
                    .filter(|p| p[0] >= x_min)
                    .collect();
                if visible.is_empty() {
                    continue;
                }
                let color = PHY_COLORS[seg as usize % PHY_COLORS.len()];
                plot_ui.line(
                    Line::new(format!("{id}-{i}"), PlotPoints::from(visible)).color(color),
                );
            }
        });
    }

    fn reference_plot(
        &self,
        ui: &mut egui::Ui,
        id: &str,
        points: &[[f64; 2]],
        height: f32,
    ) {
        let plot = Plot::new(id.to_string())
            .allow_scroll(false)
            .allow_zoom(false)
            .allow_drag(false)
            .include_y(-105.0)
            .include_y(0.0)
            .y_axis_label("Path loss (dB)")
            .x_axis_label("Ground distance (m)")
            .height(height);
        plot.show(ui, |plot_ui| {
            plot_ui.line(Line::new(id.to_string(), PlotPoints::from(points.to_vec())));
        });
    }

    fn connect_page(&mut self, ui: &mut egui::Ui) {
        ui.heading("Multi-TRX testbed");
        ui.add_space(8.0);
        ui.label("Flowgraph control endpoints:");
        egui::Grid::new("connect_grid").num_columns(2).show(ui, |ui| {
            ui.label("UAV");
            ui.add(egui::TextEdit::singleline(&mut self.uav_url).desired_width(320.0));
            ui.end_row();
            ui.label("Ground station");
            ui.add(egui::TextEdit::singleline(&mut self.ground_url).desired_width(320.0));
            ui.end_row();
        });
        ui.add_space(8.0);
        if ui.button("Connect").clicked() {
            self.connect();
        }
        if let Some(err) = &self.connect_error {
            ui.add_space(8.0);
            ui.colored_label(Color32::RED, err);
        }
    }

    fn top_strip(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("PHY:");
            let mut phy = self.selected_phy;
            for p in [Phy::Wlan, Phy::Zigbee] {
                if ui.radio_value(&mut phy, p, p.label()).clicked() && p != self.selected_phy {
                    self.change_phy(p);
                }
            }
            ui.separator();
            ui.label("Path loss:");
            let mut model = self.selected_model;
            for m in PathLossModel::ALL {
                let label = if m == self.selected_model {
                    egui::RichText::new(m.label()).strong()
                } else {
                    egui::RichText::new(m.label())
                };
                if ui.radio_value(&mut model, m, label).clicked() && m != self.selected_model {
                    self.select_model(m);
                }
            }
            if let Some(status) = &self.status {
                ui.separator();
                ui.colored_label(Color32::LIGHT_RED, status);
            }
        });
    }

    fn overview_tab(&mut self, ui: &mut egui::Ui) {
        let h = 160.0;
        ui.columns(2, |cols| {
            cols[0].label("Delivery rate (combined)");
            self.series_plot(
                &mut cols[0],
                "ov_rate",
                &self.rate_combined,
                SMALL_PLOT_SAMPLES,
                (0.0, 1.0),
                "Delivery rate",
                h,
            );
            cols[0].label("Distance to base station");
            self.series_plot(
                &mut cols[0],
                "ov_distance",
                &self.distance,
                SMALL_PLOT_SAMPLES,
                (0.0, 2000.0),
                "Distance (m)",
                h,
            );
            cols[1].label("Free-space path loss");
            self.series_plot(
                &mut cols[1],
                "ov_pl_fs",
                &self.pl_free_space,
                SMALL_PLOT_SAMPLES,
                (-100.0, 0.0),
                "Path loss (dB)",
                h,
            );
            cols[1].label("Two-ray path loss");
            self.series_plot(
                &mut cols[1],
                "ov_pl_2r",
                &self.pl_two_ray,
                SMALL_PLOT_SAMPLES,
                (-100.0, 0.0),
                "Path loss (dB)",
                h,
            );
        });
    }

    fn delivery_tab(&mut self, ui: &mut egui::Ui) {
        ui.label("Air → ground");
        self.series_plot(
            ui,
            "rate_ag",
            &self.rate_ag,
            WIDE_PLOT_SAMPLES,
            (0.0, 1.0),
            "Delivery rate",
            220.0,
        );
        ui.label("Ground → air");
        self.series_plot(
            ui,
            "rate_ga",
            &self.rate_ga,
            WIDE_PLOT_SAMPLES,
            (0.0, 1.0),
            "Delivery rate",
            220.0,
        );
    }

    fn pathloss_tab(&mut self, ui: &mut egui::Ui) {
        ui.label("Free space");
        self.series_plot(
            ui,
            "pl_fs",
            &self.pl_free_space,
            WIDE_PLOT_SAMPLES,
            (-100.0, 0.0),
            "Path loss (dB)",
            180.0,
        );
        ui.label("Flat-earth two-ray");
        self.series_plot(
            ui,
            "pl_2r",
            &self.pl_two_ray,
            WIDE_PLOT_SAMPLES,
            (-100.0, 0.0),
            "Path loss (dB)",
            180.0,
        );
        ui.separator();
        ui.horizontal(|ui| {
            ui.label("Reference curves");
            if ui
                .add(
                    egui::Slider::new(&mut self.reference_range_m, 100.0..=2000.0)
                        .text("range (m)"),
                )
                .changed()
            {
                self.recompute_reference();
            }
        });
        ui.columns(2, |cols| {
            let fs = self.reference_free_space.clone();
            let tr = self.reference_two_ray.clone();
            self.reference_plot(&mut cols[0], "ref_fs", &fs, 160.0);
            self.reference_plot(&mut cols[1], "ref_2r", &tr, 160.0);
        });
    }

    fn position_tab(&mut self, ui: &mut egui::Ui) {
        ui.label(format!(
            "Position: x = {:.1} m, y = {:.1} m, z = {:.1} m   \
             attitude: roll = {:.2}, pitch = {:.2}, yaw = {:.2}",
            self.position[0],
            self.position[1],
            self.position[2],
            self.orientation[0],
            self.orientation[1],
            self.orientation[2],
        ));
        ui.label("Distance to base station");
        self.series_plot(
            ui,
            "distance",
            &self.distance,
            WIDE_PLOT_SAMPLES,
            (0.0, 2000.0),
            "Distance (m)",
            200.0,
        );
        ui.label("Height");
        self.series_plot(
            ui,
            "height",
            &self.height,
            WIDE_PLOT_SAMPLES,
            (0.0, 150.0),
            "Height (m)",
            200.0,
        );
    }

    fn settings_tab(&mut self, ui: &mut egui::Ui) {
        ui.columns(2, |cols| {
            cols[0].heading("WLAN");
            egui::Grid::new("wlan_settings")
                .num_columns(2)
                .show(&mut cols[0], |ui| {
                    self.wlan_form.rx_gain.show(ui);
                    self.wlan_form.tx_gain.show(ui);
                    self.wlan_form.rx_offset_mhz.show(ui);
                    self.wlan_form.tx_offset_mhz.show(ui);
                    self.wlan_form.sample_rate_msps.show(ui);
                });
            cols[1].heading("Zigbee");
            egui::Grid::new("zigbee_settings")
                .num_columns(2)
                .show(&mut cols[1], |ui| {
                    self.zigbee_form.rx_gain.show(ui);
                    self.zigbee_form.tx_gain.show(ui);
                    self.zigbee_form.rx_offset_mhz.show(ui);
                    self.zigbee_form.tx_offset_mhz.show(ui);
                    self.zigbee_form.sample_rate_msps.show(ui);
                });
        });
        ui.add_space(8.0);
        ui.label(format!(
            "Center frequency: {} GHz (fixed per campaign)",
            self.config.radio.center_freq_ghz
        ));
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui.button("Apply").clicked() {
                self.apply_settings();
            }
            if ui.button("Restore defaults").clicked() {
                self.restore_settings();
            }
        });
    }
}

impl eframe::App for MonitorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ingest();
        self.sample_plots();
        // Wake up for the next plot sample even when no telemetry arrives.
        ctx.request_repaint_after(self.config.plot_interval());

        if !self.connected() {
            egui::CentralPanel::default().show(ctx, |ui| self.connect_page(ui));
            return;
        }

        egui::TopBottomPanel::top("controls").show(ctx, |ui| self.top_strip(ui));
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.tab, Tab::Overview, "Overview");
                ui.selectable_value(&mut self.tab, Tab::DeliveryRate, "Delivery rate");
                ui.selectable_value(&mut self.tab, Tab::PathLoss, "Path loss");
                ui.selectable_value(&mut self.tab, Tab::Position, "Position");
                ui.selectable_value(&mut self.tab, Tab::Settings, "Settings");
            });
            ui.separator();
            match self.tab {
                Tab::Overview => self.overview_tab(ui),
                Tab::DeliveryRate => self.delivery_tab(ui),
                Tab::PathLoss => self.pathloss_tab(ui),
                Tab::Position => self.position_tab(ui),
                Tab::Settings => self.settings_tab(ui),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};

    const DESCRIPTION: &str = r#"{"blocks":[
        {"id":0,"instance_name":"Selector<2, 1>_0"},
        {"id":1,"instance_name":"Selector<1, 2>_0"},
        {"id":2,"instance_name":"MessageSelector_0"},
        {"id":3,"instance_name":"SoapySource_0"},
        {"id":4,"instance_name":"SoapySink_0"}]}"#;

    fn read_request(stream: &mut TcpStream) -> Option<String> {
        let mut data = Vec::new();
        let mut buf = [0u8; 1024];
        while !data.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).ok()?;
            if n == 0 {
                return None;
            }
            data.extend_from_slice(&buf[..n]);
        }
        let head_end = data.windows(4).position(|w| w == b"\r\n\r\n")? + 4;
        let head = String::from_utf8_lossy(&data[..head_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|l| {
                let l = l.to_ascii_lowercase();
                l.strip_prefix("content-length:")
                    .and_then(|v| v.trim().parse::<usize>().ok())
            })
            .unwrap_or(0);
        while data.len() < head_end + content_length {
            let n = stream.read(&mut buf).ok()?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
        }
        Some(head)
    }

    fn respond(stream: &mut TcpStream, status: u16, body: &str) {
        let reason = if status < 400 { "OK" } else { "Error" };
        let _ = write!(
            stream,
            "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
    }

    /// Serves the flowgraph description on GET and answers every handler
    /// POST with `post_status`. One request per connection.
    fn spawn_stub_flowgraph(post_status: u16) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { return };
                let Some(head) = read_request(&mut stream) else {
                    continue;
                };
                if head.starts_with("GET") {
                    respond(&mut stream, 200, DESCRIPTION);
                } else {
                    respond(&mut stream, post_status, "");
                }
            }
        });
        format!("http://{addr}/api/fg/0/")
    }

    fn test_app(flowgraph_url: &str) -> MonitorApp {
        let mut config = MonitorConfig::default();
        config.uav.flowgraph_url = flowgraph_url.to_string();
        config.ground.flowgraph_url = flowgraph_url.to_string();
        config.chanem_addr = "127.0.0.1:1".to_string();
        let (_tx_counters, rx_counters) = mpsc::channel();
        let (_tx_positions, rx_positions) = mpsc::channel();
        MonitorApp::new(config, rx_counters, rx_positions)
    }

    #[test]
    fn phy_selection_follows_a_successful_switch() {
        let url = spawn_stub_flowgraph(200);
        let mut app = test_app(&url);
        app.connect();
        assert!(app.connected(), "connect failed: {:?}", app.connect_error);
        app.change_phy(Phy::Zigbee);
        assert_eq!(app.selected_phy, Phy::Zigbee);
        assert_eq!(app.uav.as_ref().unwrap().current_phy(), Phy::Zigbee);
    }

    #[test]
    fn phy_selection_stays_put_when_the_switch_fails() {
        let url = spawn_stub_flowgraph(500);
        let mut app = test_app(&url);
        app.connect();
        assert!(app.connected(), "connect failed: {:?}", app.connect_error);
        app.change_phy(Phy::Zigbee);
        // The flowgraphs rejected the switch: the shown PHY must not move.
        assert_eq!(app.selected_phy, Phy::Wlan);
        assert_eq!(app.uav.as_ref().unwrap().current_phy(), Phy::Wlan);
        assert!(app.status.is_some());
    }
}

/// Launch the monitor: spawn the telemetry listeners and enter the eframe
/// event loop. Blocks until the window is closed.
pub fn run(config: MonitorConfig) -> eframe::Result<()> {
    let opts = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size(egui::vec2(1200.0, 800.0)),
        ..Default::default()
    };
    eframe::run_native(
        "Multi-TRX Monitor",
        opts,
        Box::new(move |cc| {
            let (tx_counters, rx_counters) = mpsc::channel();
            let (tx_positions, rx_positions) = mpsc::channel();
            if let Err(e) =
                spawn_counter_listener(config.counter_port, tx_counters, cc.egui_ctx.clone())
            {
                error!("counter listener on port {}: {e}", config.counter_port);
            }
            if let Err(e) =
                spawn_position_listener(config.position_port, tx_positions, cc.egui_ctx.clone())
            {
                error!("position listener on port {}: {e}", config.position_port);
            }
            Ok(Box::new(MonitorApp::new(config, rx_counters, rx_positions)))
        }),
    )
}
