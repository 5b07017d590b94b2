//! STV IPTV
//! Desktop front end for live channels, a movie grid and notifications

// Hide console window on Windows release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

// Use mimalloc for faster memory allocation (Linux, macOS)
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use eframe::egui;
use serde::de::DeserializeOwned;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

mod clock;
mod config;
mod embed_policy;
mod feed;
mod logging;
mod models;
mod notifications;
mod player;
mod router;
mod scheduler;
mod store;

use clock::{Clock, SystemClock};
use config::AppConfig;
use embed_policy::EmbedPolicy;
use feed::{FeedClient, FeedError};
use models::*;
use notifications::{
    LivePoller, Notification, NotificationOpen, NotificationPanel, NotificationRepository,
    PanelView, ToastSequencer,
};
use player::launcher::{self, LaunchRequest};
use player::{MediaDescriptor, MediaKind, PlayerAction, PlayerWindow, ResumeStore};
use router::TabRouter;
use store::{FileStore, KeyValueStore};

/// How long a card opened from a notification stays highlighted
const HIGHLIGHT_DURATION: Duration = Duration::from_secs(4);
const CONSOLE_LINES: usize = 500;
const BADGE_REFRESH: Duration = Duration::from_secs(1);

/// Get current local time as HH:MM:SS
fn timestamp_now() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// Window icon: rounded gradient square with a play triangle
fn load_icon() -> egui::IconData {
    let size: usize = 64;
    let mut rgba = vec![0u8; size * size * 4];

    for y in 0..size {
        for x in 0..size {
            let idx = (y * size + x) * 4;
            let nx = x as f32 / size as f32;
            let ny = y as f32 / size as f32;

            let corner_radius = 0.125;
            let in_rounded_rect = {
                let dx = if nx < corner_radius { corner_radius - nx }
                         else if nx > 1.0 - corner_radius { nx - (1.0 - corner_radius) }
                         else { 0.0 };
                let dy = if ny < corner_radius { corner_radius - ny }
                         else if ny > 1.0 - corner_radius { ny - (1.0 - corner_radius) }
                         else { 0.0 };
                dx * dx + dy * dy <= corner_radius * corner_radius
            };
            if !in_rounded_rect {
                continue;
            }

            let in_play = {
                let px = nx - 0.36;
                let py = ny - 0.5;
                px >= 0.0 && px <= 0.34 && py.abs() <= (0.34 - px) * 0.6
            };

            let pixel = if in_play {
                [255, 255, 255]
            } else {
                // Red to orange gradient
                let t = nx * 0.5 + ny * 0.5;
                [
                    (220.0 + 25.0 * t) as u8,
                    (38.0 + 100.0 * t) as u8,
                    (38.0 + 10.0 * t) as u8,
                ]
            };
            rgba[idx..idx + 3].copy_from_slice(&pixel);
            rgba[idx + 3] = 255;
        }
    }

    egui::IconData {
        rgba,
        width: size as u32,
        height: size as u32,
    }
}

/// Add the platform emoji font so tab and button icons render
fn setup_fonts(ctx: &egui::Context) {
    let mut fonts = egui::FontDefinitions::default();

    let candidates: &[&str] = if cfg!(target_os = "windows") {
        &["C:\\Windows\\Fonts\\seguiemj.ttf"]
    } else if cfg!(target_os = "macos") {
        &["/System/Library/Fonts/Apple Color Emoji.ttc"]
    } else {
        &[
            "/usr/share/fonts/truetype/noto/NotoColorEmoji.ttf",
            "/usr/share/fonts/noto-emoji/NotoColorEmoji.ttf",
            "/usr/share/fonts/google-noto-emoji/NotoColorEmoji.ttf",
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        ]
    };

    for path in candidates {
        if let Ok(font_data) = std::fs::read(path) {
            fonts.font_data.insert(
                "emoji".to_owned(),
                egui::FontData::from_owned(font_data).into(),
            );
            fonts.families
                .entry(egui::FontFamily::Proportional)
                .or_default()
                .push("emoji".to_owned());
            break;
        }
    }

    ctx.set_fonts(fonts);
}

/// Background task messages
enum TaskResult {
    NotificationsLoaded(Result<Vec<Notification>, FeedError>),
    NotificationsPolled(Result<Vec<Notification>, FeedError>),
    ImagesLoaded(ImagesPage),
    VideosLoaded(VideosPage),
    ChannelsLoaded(ChannelsConfig),
}

/// Context for background fetch operations
struct FetchContext {
    user_agent: String,
    sender: Sender<TaskResult>,
    repaint: egui::Context,
}

impl FetchContext {
    fn client(&self) -> FeedClient {
        FeedClient::new(&self.user_agent)
    }

    fn spawn<F>(self, task: F)
    where
        F: FnOnce(&FeedClient) -> TaskResult + Send + 'static,
    {
        thread::spawn(move || {
            let result = task(&self.client());
            let _ = self.sender.send(result);
            self.repaint.request_repaint();
        });
    }
}

/// Catalog pages fall back to their built-in defaults when unavailable
fn load_or_default<T: DeserializeOwned + Default>(client: &FeedClient, url: &str, what: &str) -> T {
    match client.get_json(url) {
        Ok(value) => value,
        Err(e) => {
            warn!("Using built-in {}: {} ({})", what, e, url);
            T::default()
        }
    }
}

fn main() -> Result<(), eframe::Error> {
    let (log_sender, log_receiver) = channel();
    logging::init(log_sender);
    info!("STV IPTV {} starting", env!("CARGO_PKG_VERSION"));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 700.0])
            .with_min_inner_size([800.0, 500.0])
            .with_icon(load_icon()),
        vsync: true,
        hardware_acceleration: eframe::HardwareAcceleration::Preferred,
        ..Default::default()
    };

    eframe::run_native(
        "STV IPTV",
        options,
        Box::new(|cc| {
            setup_fonts(&cc.egui_ctx);
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Ok(Box::new(StvApp::new(cc.egui_ctx.clone(), log_receiver)))
        }),
    )
}

struct StvApp {
    config: AppConfig,
    settings_draft: AppConfig,
    show_settings: bool,
    applied_font_size: u32,

    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,

    // Notifications
    repo: NotificationRepository,
    panel: NotificationPanel,
    sequencer: ToastSequencer,
    poller: LivePoller,
    notifications_ready: bool,
    badge: usize,
    badge_refreshed: Option<Instant>,
    window_visible: bool,

    // Navigation
    router: TabRouter,
    swipe_origin: Option<egui::Pos2>,
    swipe_blocked: bool,

    // Content
    images: ImagesPage,
    videos: VideosPage,
    channels: ChannelsConfig,
    embed_policy: EmbedPolicy,
    search_query: String,
    highlight: Option<(usize, Instant)>,
    pending_highlight: Option<String>,
    scroll_to_highlight: bool,

    player: PlayerWindow,

    console_log: Vec<String>,
    log_receiver: Receiver<String>,
    status_message: String,

    task_sender: Sender<TaskResult>,
    task_receiver: Receiver<TaskResult>,
    repaint: egui::Context,
}

impl StvApp {
    fn new(repaint: egui::Context, log_receiver: Receiver<String>) -> Self {
        let config = AppConfig::load();
        info!("Config loaded from: {:?}", AppConfig::config_path());

        let store_path = FileStore::default_path();
        info!("Storage: {:?}", store_path);
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(store_path));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let repo = NotificationRepository::new(store.clone(), clock.clone());
        let channels = ChannelsConfig::default();
        let embed_policy = policy_for(&channels);
        let player = PlayerWindow::new(
            ResumeStore::new(store.clone(), clock.clone()),
            config.effective_user_agent(),
            !config.external_player.trim().is_empty(),
        );
        let (task_sender, task_receiver) = channel();

        let mut app = Self {
            settings_draft: config.clone(),
            show_settings: false,
            applied_font_size: 0,
            panel: NotificationPanel::new(repo.clone()),
            sequencer: ToastSequencer::new(repo.clone(), config.sequencer_timing()),
            poller: LivePoller::new(repo.clone(), config.poller_timing()),
            notifications_ready: false,
            badge: 0,
            badge_refreshed: None,
            window_visible: true,
            router: TabRouter::restore(store.clone()),
            swipe_origin: None,
            swipe_blocked: false,
            images: ImagesPage::default(),
            videos: VideosPage::default(),
            channels,
            embed_policy,
            search_query: String::new(),
            highlight: None,
            pending_highlight: None,
            scroll_to_highlight: false,
            player,
            console_log: vec![format!("[{}] [INFO] STV IPTV started", timestamp_now())],
            log_receiver,
            status_message: "Ready".to_string(),
            task_sender,
            task_receiver,
            repaint,
            config,
            store,
            clock,
            repo,
        };

        app.load_catalog();
        app.load_notifications();
        app
    }

    fn log_line(&mut self, line: String) {
        self.console_log.push(format!("[{}] {}", timestamp_now(), line));
        // Keep last 500 lines
        if self.console_log.len() > CONSOLE_LINES {
            let excess = self.console_log.len() - CONSOLE_LINES;
            self.console_log.drain(..excess);
        }
    }

    fn fetch_context(&self) -> FetchContext {
        FetchContext {
            user_agent: self.config.effective_user_agent().to_string(),
            sender: self.task_sender.clone(),
            repaint: self.repaint.clone(),
        }
    }

    fn load_catalog(&mut self) {
        let images_url = self.config.images_url.clone();
        self.fetch_context().spawn(move |client| {
            TaskResult::ImagesLoaded(load_or_default(client, &images_url, "movies page"))
        });

        let videos_url = self.config.videos_url.clone();
        self.fetch_context().spawn(move |client| {
            TaskResult::VideosLoaded(load_or_default(client, &videos_url, "videos page"))
        });

        let channels_url = self.config.channels_url.clone();
        self.fetch_context().spawn(move |client| {
            TaskResult::ChannelsLoaded(load_or_default(client, &channels_url, "channel list"))
        });
    }

    fn load_notifications(&mut self) {
        let url = self.config.notifications_url.clone();
        self.fetch_context().spawn(move |client| {
            TaskResult::NotificationsLoaded(client.fetch_notifications(&url))
        });
    }

    fn poll_notifications(&mut self) {
        let url = self.config.notifications_url.clone();
        self.fetch_context().spawn(move |client| {
            TaskResult::NotificationsPolled(client.fetch_notifications(&url))
        });
    }

    fn handle_task(&mut self, result: TaskResult, now: Instant) {
        match result {
            TaskResult::NotificationsLoaded(result) => {
                if let Err(ref e) = result {
                    warn!("Notifications unavailable, using stored copy: {}", e);
                }
                let active = self.repo.load(result);
                info!("{} active notifications", active.len());
                self.notifications_ready = true;
                self.sequencer.set_visible(self.window_visible, now);
                if self.window_visible {
                    self.sequencer.start(now);
                }
                self.poller.start(now);
                self.refresh_badge(now, true);
            }
            TaskResult::NotificationsPolled(result) => {
                let fresh = self.poller.on_fetch(result, &mut self.sequencer, now);
                if !fresh.is_empty() {
                    info!("{} new notifications", fresh.len());
                    self.refresh_badge(now, true);
                }
            }
            TaskResult::ImagesLoaded(page) => {
                debug!("Movies page '{}' with {} cards", page.title, page.items.len());
                self.images = page;
                if let Some(name) = self.pending_highlight.take() {
                    self.highlight_card(&name, now);
                }
            }
            TaskResult::VideosLoaded(page) => {
                debug!("Videos page with {} entries", page.items.len());
                self.videos = page;
            }
            TaskResult::ChannelsLoaded(channels) => {
                debug!(
                    "Channels: {} live, {} world",
                    channels.live.channels.len(),
                    channels.world.channels.len()
                );
                self.embed_policy = policy_for(&channels);
                self.channels = channels;
            }
        }
    }

    fn refresh_badge(&mut self, now: Instant, force: bool) {
        let stale = self
            .badge_refreshed
            .map_or(true, |at| now.duration_since(at) >= BADGE_REFRESH);
        if force || stale {
            self.badge = self.panel.update_badge();
            self.badge_refreshed = Some(now);
        }
    }

    /// A minimized window counts as hidden: the toast rotation stops and
    /// starts over when the window comes back.
    fn track_visibility(&mut self, ctx: &egui::Context, now: Instant) {
        let minimized = ctx.input(|i| i.viewport().minimized.unwrap_or(false));
        let visible = !minimized;
        if visible == self.window_visible {
            return;
        }
        self.window_visible = visible;
        debug!("Window visible: {}", visible);
        if self.notifications_ready {
            self.sequencer.set_visible(visible, now);
        }
    }

    fn rebuild_notification_timers(&mut self, now: Instant) {
        self.sequencer.stop();
        self.sequencer = ToastSequencer::new(self.repo.clone(), self.config.sequencer_timing());
        self.poller.stop();
        self.poller = LivePoller::new(self.repo.clone(), self.config.poller_timing());
        if self.notifications_ready {
            self.sequencer.set_visible(self.window_visible, now);
            if self.window_visible {
                self.sequencer.start(now);
            }
            self.poller.start(now);
        }
    }

    fn handle_navigation_input(&mut self, ctx: &egui::Context) {
        let (back, forward) = ctx.input(|i| {
            (
                i.pointer.button_pressed(egui::PointerButton::Extra1)
                    || (i.modifiers.alt && i.key_pressed(egui::Key::ArrowLeft)),
                i.pointer.button_pressed(egui::PointerButton::Extra2)
                    || (i.modifiers.alt && i.key_pressed(egui::Key::ArrowRight)),
            )
        });
        if back {
            self.router.back();
        }
        if forward {
            self.router.forward();
        }

        // Swipes only count on the page itself, never while a widget is dragged
        if self.player.is_open() || self.panel.is_open() || self.show_settings {
            self.swipe_origin = None;
            return;
        }
        let (pressed, released, origin, pos) = ctx.input(|i| {
            (
                i.pointer.any_pressed(),
                i.pointer.any_released(),
                i.pointer.press_origin(),
                i.pointer.interact_pos(),
            )
        });
        if pressed {
            self.swipe_origin = origin;
            self.swipe_blocked = false;
        }
        if self.swipe_origin.is_some() && ctx.is_using_pointer() {
            self.swipe_blocked = true;
        }
        if released {
            if let (Some(start), Some(end)) = (self.swipe_origin.take(), pos) {
                if !self.swipe_blocked {
                    let delta = end - start;
                    if let Some(tab) = self.router.on_swipe(delta.x, delta.y) {
                        debug!("Swiped to {:?}", tab);
                    }
                }
            }
        }
    }

    fn dispatch_open(&mut self, open: NotificationOpen, now: Instant) {
        match open {
            NotificationOpen::Channel(channel) => {
                info!("Notification opens channel {}", channel);
                self.router.select_channel(Tab::Live, &channel);
                self.router.navigate(Tab::Live);
            }
            NotificationOpen::Image(name) => {
                info!("Notification opens movie '{}'", name);
                self.router.navigate(Tab::Movies);
                self.highlight_card(&name, now);
            }
            NotificationOpen::ShowText { title, body } => {
                self.sequencer.present_text(&title, &body, now);
            }
        }
    }

    fn highlight_card(&mut self, name: &str, now: Instant) {
        if self.images.items.is_empty() {
            self.pending_highlight = Some(name.to_string());
            return;
        }
        match self.images.find_card(name) {
            Some(idx) => {
                self.search_query.clear();
                self.highlight = Some((idx, now + HIGHLIGHT_DURATION));
                self.scroll_to_highlight = true;
            }
            None => debug!("No movie card matches '{}'", name),
        }
    }

    /// Direct media goes to the external player when one is configured,
    /// everything else to the built-in player window.
    fn play_media(&mut self, descriptor: MediaDescriptor) {
        let external = self.config.external_player.trim().to_string();
        if descriptor.kind() != MediaKind::Embed && !external.is_empty() {
            self.launch(&descriptor.src, &descriptor.title, &external);
        } else if self.player.open(descriptor) {
            self.status_message = format!("Playing: {}", self.player.title());
        }
    }

    /// Web players open in the system browser, unless the page is blocked
    fn open_web_page(&mut self, url: &str, title: &str) {
        let Some(page) = self.embed_policy.web_page_url(url) else {
            warn!("Blocked embed page {}", url);
            self.status_message = format!("Blocked: {}", title);
            return;
        };
        self.launch(page.as_str(), title, "");
    }

    fn launch(&mut self, url: &str, title: &str, player: &str) {
        let request = LaunchRequest {
            url: url.to_string(),
            title: title.to_string(),
            player: player.to_string(),
            user_agent: self.config.effective_user_agent().to_string(),
            buffer_secs: self.config.buffer_seconds,
            hw_accel: self.config.hw_accel,
        };
        match launcher::launch(&request) {
            Ok(pid) => {
                info!("Opened '{}' (PID: {})", title, pid);
                self.status_message = format!("Opened: {}", title);
            }
            Err(e) => {
                warn!("Failed to open '{}': {}", title, e);
                self.status_message = format!("Failed to open: {}", e);
            }
        }
    }

    fn apply_appearance(&mut self, ctx: &egui::Context) {
        if self.config.dark_mode {
            ctx.set_visuals(egui::Visuals::dark());
        } else {
            ctx.set_visuals(egui::Visuals::light());
        }

        if self.applied_font_size != self.config.font_size {
            self.applied_font_size = self.config.font_size;
            let scale = self.config.font_size.clamp(8, 32) as f32 / 12.0;
            ctx.style_mut(|style| {
                for (text_style, font_id) in style.text_styles.iter_mut() {
                    let base = match text_style {
                        egui::TextStyle::Heading => 18.0,
                        egui::TextStyle::Small => 9.0,
                        egui::TextStyle::Monospace => 12.0,
                        _ => 12.5,
                    };
                    font_id.size = base * scale;
                }
            });
        }
    }

    fn schedule_repaint(&self, ctx: &egui::Context, now: Instant) {
        let next = [
            self.sequencer.next_due(),
            self.poller.next_due(),
            self.highlight.map(|(_, until)| until),
        ]
        .into_iter()
        .flatten()
        .min();
        if let Some(at) = next {
            ctx.request_repaint_after(at.saturating_duration_since(now));
        }
    }
}

impl eframe::App for StvApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();

        while let Ok(line) = self.log_receiver.try_recv() {
            self.log_line(line);
        }

        // Process background task results (non-blocking)
        while let Ok(result) = self.task_receiver.try_recv() {
            self.handle_task(result, now);
        }

        self.track_visibility(ctx, now);
        self.sequencer.tick(now);
        if self.poller.due(now) {
            self.poll_notifications();
        }
        if matches!(self.highlight, Some((_, until)) if now >= until) {
            self.highlight = None;
        }
        self.refresh_badge(now, false);
        self.apply_appearance(ctx);
        self.handle_navigation_input(ctx);

        // Top panel - tabs and notification bell
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.add_space(5.0);
            ui.horizontal(|ui| {
                ui.heading("📺 STV");
                ui.separator();

                if ui
                    .add_enabled(self.router.can_go_back(), egui::Button::new("◀"))
                    .on_hover_text("Back (Alt+Left)")
                    .clicked()
                {
                    self.router.back();
                }
                if ui
                    .add_enabled(self.router.can_go_forward(), egui::Button::new("▶"))
                    .on_hover_text("Forward (Alt+Right)")
                    .clicked()
                {
                    self.router.forward();
                }
                ui.separator();

                let mut tab = self.router.active();
                for t in Tab::ALL {
                    ui.selectable_value(&mut tab, t, t.label());
                }
                if tab != self.router.active() {
                    self.router.navigate(tab);
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("⚙").on_hover_text("Settings").clicked() {
                        self.settings_draft = self.config.clone();
                        self.show_settings = true;
                    }

                    let bell = if self.badge > 0 {
                        format!("🔔 {}", self.badge)
                    } else {
                        "🔔".to_string()
                    };
                    if ui.button(bell).on_hover_text("Notifications").clicked() {
                        self.panel.toggle();
                    }
                });
            });
            ui.add_space(5.0);
        });

        // Bottom panel - status
        egui::TopBottomPanel::bottom("bottom_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status_message);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!("Notifications: {}", self.badge));
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| match self.router.active() {
            Tab::Live => self.show_channel_tab(ui, Tab::Live),
            Tab::World => self.show_channel_tab(ui, Tab::World),
            Tab::Movies => self.show_movies_tab(ui),
            Tab::Videos => self.show_videos_tab(ui),
            Tab::Console => self.show_console_tab(ui),
        });

        self.show_notification_panel(ctx, now);
        self.show_settings_window(ctx, now);

        // Player Window
        if self.player.is_open() {
            let mut open = true;
            let mut action = PlayerAction::None;
            egui::Window::new(format!("🎬 {}", self.player.title()))
                .id(egui::Id::new("player_window"))
                .open(&mut open)
                .resizable(true)
                .default_size([860.0, 540.0])
                .show(ctx, |ui| {
                    action = self.player.show(ctx, ui);
                });

            if !open {
                self.player.close(ctx);
            }
            match action {
                PlayerAction::OpenExternally(descriptor) => {
                    self.open_web_page(&descriptor.src, &descriptor.title);
                }
                PlayerAction::Cast(descriptor) => {
                    let external = self.config.external_player.trim().to_string();
                    self.launch(&descriptor.src, &descriptor.title, &external);
                }
                PlayerAction::Closed => self.status_message = "Player closed".to_string(),
                PlayerAction::None => {}
            }
        }

        self.show_toast(ctx, now);
        self.schedule_repaint(ctx, now);
    }
}

impl StvApp {
    fn show_channel_tab(&mut self, ui: &mut egui::Ui, tab: Tab) {
        let set = match tab {
            Tab::World => self.channels.world.clone(),
            _ => self.channels.live.clone(),
        };
        let saved = self.router.selected_channel(tab);
        let current = set.resolve(saved.as_deref()).to_string();
        let mut selected = current.clone();

        ui.heading(&set.title);
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.label("Channel:");
            egui::ComboBox::from_id_salt(("channel", tab.key()))
                .selected_text(set.label_for(&selected))
                .width(220.0)
                .show_ui(ui, |ui| {
                    for entry in &set.channels {
                        ui.selectable_value(&mut selected, entry.value.clone(), &entry.label);
                    }
                });
        });
        if selected != current {
            info!("Selected channel {}", selected);
            self.router.select_channel(tab, &selected);
        }

        ui.add_space(8.0);
        ui.horizontal_wrapped(|ui| {
            for entry in &set.channels {
                if ui.selectable_label(entry.value == selected, &entry.label).clicked()
                    && entry.value != selected
                {
                    self.router.select_channel(tab, &entry.value);
                }
            }
        });

        ui.add_space(12.0);
        let url = set.embed_url(&selected);
        ui.label(egui::RichText::new(&url).small().weak());
        if ui.button("▶ Open stream").clicked() {
            let title = set.label_for(&selected).to_string();
            self.open_web_page(&url, &title);
        }
    }

    fn show_movies_tab(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading(&self.images.title);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.add(
                    egui::TextEdit::singleline(&mut self.search_query)
                        .hint_text("🔍 Search")
                        .desired_width(200.0),
                );
            });
        });
        ui.separator();

        if self.images.items.is_empty() {
            ui.label("No movies available");
            return;
        }

        let query = self.search_query.trim().to_lowercase();
        let highlighted = self.highlight.map(|(idx, _)| idx);
        let scroll_to = std::mem::take(&mut self.scroll_to_highlight);
        let mut to_play = None;

        egui::ScrollArea::vertical()
            .id_salt("movies_scroll")
            .auto_shrink([false, false])
            .enable_scrolling(!self.player.overlay.is_scroll_locked())
            .show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    for (idx, card) in self.images.items.iter().enumerate() {
                        if !query.is_empty() && !card.name.to_lowercase().contains(&query) {
                            continue;
                        }
                        let mut frame = egui::Frame::group(ui.style()).inner_margin(8.0);
                        if highlighted == Some(idx) {
                            frame = frame.stroke(egui::Stroke::new(2.0, egui::Color32::GOLD));
                        }
                        let response = frame
                            .show(ui, |ui| {
                                ui.set_width(170.0);
                                ui.vertical(|ui| {
                                    ui.label(egui::RichText::new(card.display_title()).strong());
                                    let playable = card.descriptor();
                                    if ui
                                        .add_enabled(playable.is_some(), egui::Button::new("▶ Play"))
                                        .clicked()
                                    {
                                        to_play = playable;
                                    }
                                });
                            })
                            .response;
                        if scroll_to && highlighted == Some(idx) {
                            response.scroll_to_me(Some(egui::Align::Center));
                        }
                    }
                });
            });

        if let Some(descriptor) = to_play {
            self.play_media(descriptor);
        }
    }

    fn show_videos_tab(&mut self, ui: &mut egui::Ui) {
        ui.heading(&self.videos.title);
        ui.separator();

        if self.videos.items.is_empty() {
            ui.label("No videos available");
            return;
        }

        let mut to_play = None;
        egui::ScrollArea::vertical()
            .id_salt("videos_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for video in &self.videos.items {
                    ui.horizontal(|ui| {
                        if ui
                            .add_enabled(!video.src.trim().is_empty(), egui::Button::new("▶"))
                            .clicked()
                        {
                            to_play = Some(MediaDescriptor::new(&video.title, &video.src));
                        }
                        ui.label(&video.title);
                    });
                }
            });

        if let Some(descriptor) = to_play {
            // Well-known video sites open straight in the browser
            if descriptor.kind() == MediaKind::Embed
                && self.embed_policy.should_allow_popup(&descriptor.src)
            {
                self.open_web_page(&descriptor.src, &descriptor.title);
            } else {
                self.play_media(descriptor);
            }
        }
    }

    fn show_console_tab(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Console Log");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("🗑 Clear").clicked() {
                    self.console_log.clear();
                    self.console_log.push(format!("[{}] Console cleared", timestamp_now()));
                }
            });
        });
        ui.separator();

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &self.console_log {
                    let color = if line.contains("[ERROR]") {
                        egui::Color32::RED
                    } else if line.contains("[WARN]") {
                        egui::Color32::YELLOW
                    } else if line.contains("[INFO]") {
                        egui::Color32::LIGHT_BLUE
                    } else {
                        egui::Color32::GRAY
                    };

                    ui.label(egui::RichText::new(line).monospace().color(color));
                }
            });
    }

    fn show_notification_panel(&mut self, ctx: &egui::Context, now: Instant) {
        if !self.panel.is_open() {
            return;
        }

        let view = self.panel.render();
        let mut open = true;
        let mut to_open = None;
        let mut to_delete = None;
        let mut clear_all = false;

        egui::Window::new("🔔 Notifications")
            .open(&mut open)
            .collapsible(false)
            .resizable(true)
            .default_width(360.0)
            .anchor(egui::Align2::RIGHT_TOP, [-10.0, 40.0])
            .show(ctx, |ui| match &view {
                PanelView::Empty { placeholder } => {
                    ui.label(*placeholder);
                }
                PanelView::Rows(rows) => {
                    egui::ScrollArea::vertical().max_height(420.0).show(ui, |ui| {
                        for row in rows {
                            ui.group(|ui| {
                                ui.set_width(ui.available_width());
                                ui.horizontal(|ui| {
                                    ui.label(egui::RichText::new(&row.title).strong());
                                    ui.with_layout(
                                        egui::Layout::right_to_left(egui::Align::Center),
                                        |ui| {
                                            ui.small(&row.created);
                                        },
                                    );
                                });
                                if !row.body.is_empty() {
                                    ui.label(&row.body);
                                }
                                ui.horizontal(|ui| {
                                    ui.small(&row.expiry);
                                    ui.with_layout(
                                        egui::Layout::right_to_left(egui::Align::Center),
                                        |ui| {
                                            if ui.small_button("🗑").on_hover_text("Delete").clicked() {
                                                to_delete = Some(row.id.clone());
                                            }
                                            if ui.small_button("Open").clicked() {
                                                to_open = Some(row.id.clone());
                                            }
                                        },
                                    );
                                });
                            });
                        }
                    });
                    ui.separator();
                    if ui.button("🗑 Clear all").clicked() {
                        clear_all = true;
                    }
                }
            });

        if !open {
            self.panel.close();
        }
        if let Some(id) = to_delete {
            self.panel.delete(&id);
            self.refresh_badge(now, true);
        }
        if clear_all {
            self.panel.clear_all();
            self.refresh_badge(now, true);
        }
        if let Some(id) = to_open {
            if let Some(action) = self.panel.open(&id) {
                self.dispatch_open(action, now);
            }
        }
    }

    fn show_toast(&mut self, ctx: &egui::Context, now: Instant) {
        let Some(toast) = self.sequencer.visible_toast().cloned() else {
            return;
        };

        let mut dismiss = false;
        let mut to_open = None;
        egui::Area::new(egui::Id::new("toast_slot"))
            .anchor(egui::Align2::RIGHT_BOTTOM, [-16.0, -40.0])
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                let frame = egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_max_width(320.0);
                    ui.label(egui::RichText::new(&toast.title).strong());
                    if !toast.body.is_empty() {
                        ui.label(&toast.body);
                    }
                    ui.horizontal(|ui| {
                        if !toast.meta.is_empty() {
                            ui.small(&toast.meta);
                        }
                        if let Some(id) = &toast.notification_id {
                            if ui.small_button("Open").clicked() {
                                to_open = Some(id.clone());
                            }
                        }
                    });
                });
                if frame.response.interact(egui::Sense::click()).clicked() {
                    dismiss = true;
                }
            });

        if let Some(id) = to_open {
            self.sequencer.dismiss(now);
            if let Some(action) = self.panel.open(&id) {
                self.dispatch_open(action, now);
            }
        } else if dismiss {
            self.sequencer.dismiss(now);
        }
    }

    fn show_settings_window(&mut self, ctx: &egui::Context, now: Instant) {
        if !self.show_settings {
            return;
        }

        let mut open = true;
        let mut save = false;
        let mut reset = false;
        let draft = &mut self.settings_draft;

        egui::Window::new("⚙ Settings")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .min_width(460.0)
            .show(ctx, |ui| {
                ui.heading("Sources");
                egui::Grid::new("sources_grid").num_columns(2).spacing([10.0, 6.0]).show(ui, |ui| {
                    ui.label("Notifications:");
                    ui.add(egui::TextEdit::singleline(&mut draft.notifications_url).desired_width(320.0));
                    ui.end_row();
                    ui.label("Movies:");
                    ui.add(egui::TextEdit::singleline(&mut draft.images_url).desired_width(320.0));
                    ui.end_row();
                    ui.label("Videos:");
                    ui.add(egui::TextEdit::singleline(&mut draft.videos_url).desired_width(320.0));
                    ui.end_row();
                    ui.label("Channels:");
                    ui.add(egui::TextEdit::singleline(&mut draft.channels_url).desired_width(320.0));
                    ui.end_row();
                });

                ui.separator();
                ui.heading("Notifications");
                egui::Grid::new("timing_grid").num_columns(2).spacing([10.0, 6.0]).show(ui, |ui| {
                    ui.label("First toast after (ms):");
                    ui.add(egui::DragValue::new(&mut draft.toast_initial_delay_ms).range(0..=60_000));
                    ui.end_row();
                    ui.label("Toast duration (ms):");
                    ui.add(egui::DragValue::new(&mut draft.toast_duration_ms).range(500..=60_000));
                    ui.end_row();
                    ui.label("Gap between toasts (ms):");
                    ui.add(egui::DragValue::new(&mut draft.toast_gap_ms).range(0..=60_000));
                    ui.end_row();
                    ui.label("Check for new every (ms):");
                    ui.add(egui::DragValue::new(&mut draft.poll_interval_ms).range(0..=3_600_000))
                        .on_hover_text("0 disables live updates");
                    ui.end_row();
                    ui.label("Stagger new toasts (ms):");
                    ui.add(egui::DragValue::new(&mut draft.poll_stagger_ms).range(0..=10_000));
                    ui.end_row();
                });

                ui.separator();
                ui.heading("Player");
                egui::Grid::new("player_grid").num_columns(2).spacing([10.0, 6.0]).show(ui, |ui| {
                    ui.label("External player:");
                    ui.add(
                        egui::TextEdit::singleline(&mut draft.external_player)
                            .hint_text("mpv, vlc, ffplay (empty = built-in)")
                            .desired_width(320.0),
                    );
                    ui.end_row();
                    ui.label("Buffer (seconds):");
                    ui.add(egui::DragValue::new(&mut draft.buffer_seconds).range(1..=60));
                    ui.end_row();
                    ui.label("Hardware decoding:");
                    ui.checkbox(&mut draft.hw_accel, "");
                    ui.end_row();
                    ui.label("User agent:");
                    ui.add(egui::TextEdit::singleline(&mut draft.user_agent).desired_width(320.0));
                    ui.end_row();
                });

                ui.separator();
                ui.heading("Appearance");
                ui.horizontal(|ui| {
                    ui.checkbox(&mut draft.dark_mode, "Dark mode");
                    ui.label("Font size:");
                    ui.add(egui::DragValue::new(&mut draft.font_size).range(8..=32));
                });

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("💾 Save").clicked() {
                        save = true;
                    }
                    if ui.button("↺ Reset to defaults").clicked() {
                        reset = true;
                    }
                });
            });

        if reset {
            self.settings_draft = AppConfig::default();
        }
        if save {
            self.apply_settings(now);
            open = false;
        }
        if !open {
            self.show_settings = false;
        }
    }

    fn apply_settings(&mut self, now: Instant) {
        let previous = std::mem::replace(&mut self.config, self.settings_draft.clone());
        self.config.save();
        info!("Settings saved");

        let timing_changed = previous.sequencer_timing() != self.config.sequencer_timing()
            || previous.poller_timing() != self.config.poller_timing();
        if timing_changed {
            self.rebuild_notification_timers(now);
        }

        let player_changed = previous.user_agent != self.config.user_agent
            || previous.external_player != self.config.external_player;
        if player_changed && !self.player.is_open() {
            self.player = PlayerWindow::new(
                ResumeStore::new(self.store.clone(), self.clock.clone()),
                self.config.effective_user_agent(),
                !self.config.external_player.trim().is_empty(),
            );
        }

        let sources_changed = previous.images_url != self.config.images_url
            || previous.videos_url != self.config.videos_url
            || previous.channels_url != self.config.channels_url;
        if sources_changed {
            self.load_catalog();
        }
        if previous.notifications_url != self.config.notifications_url {
            self.load_notifications();
        }
        self.status_message = "Settings saved".to_string();
    }
}

/// Pages of both channel sets are the app's own and always trusted
fn policy_for(channels: &ChannelsConfig) -> EmbedPolicy {
    EmbedPolicy::with_homes(&[
        channels.live.embed_template.as_str(),
        channels.world.embed_template.as_str(),
    ])
}
