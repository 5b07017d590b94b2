//! egui rendering of the player overlay

use std::time::Instant;

use eframe::egui;

use super::capabilities::{CapabilityProbe, PlaybackCapabilities};
use super::element::FfmpegElement;
use super::media::{MediaDescriptor, MediaElement, MediaKind, NativeHls};
use super::overlay::{PlayerOverlay, PlayerState, PlayerTiming};
use super::resume::{format_time, ResumeStore};

/// A desktop window can always go fullscreen as a whole (close button
/// included) and shrink into an always-on-top mini player, the desktop
/// form of picture-in-picture. Casting hands the stream to the configured
/// external player, so it exists only when one is set.
pub struct DesktopProbe {
    pub external_player: bool,
}

impl CapabilityProbe for DesktopProbe {
    fn probe(&self) -> PlaybackCapabilities {
        PlaybackCapabilities {
            picture_in_picture: true,
            cast: self.external_player,
            modal_fullscreen: true,
            ..Default::default()
        }
    }
}

const MINI_PLAYER_SIZE: egui::Vec2 = egui::vec2(480.0, 300.0);

/// What the shell has to do after a frame of the player window
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerAction {
    None,
    Closed,
    OpenExternally(MediaDescriptor),
    /// Continue on the external player; the window already closed itself
    Cast(MediaDescriptor),
}

/// Player window that can be embedded in egui
pub struct PlayerWindow {
    pub overlay: PlayerOverlay<FfmpegElement>,
    texture: Option<egui::TextureHandle>,
    fullscreen: bool,
    /// Window size to restore when leaving the mini player
    mini_player: Option<egui::Vec2>,
}

impl PlayerWindow {
    pub fn new(resume: ResumeStore, user_agent: &str, external_player: bool) -> Self {
        // FFmpeg opens HLS manifests itself, so no separate stream client
        let overlay = PlayerOverlay::new(
            FfmpegElement::new(user_agent),
            resume,
            Box::new(DesktopProbe { external_player }),
            Box::new(NativeHls),
            PlayerTiming::default(),
        );
        Self {
            overlay,
            texture: None,
            fullscreen: false,
            mini_player: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.overlay.is_open()
    }

    pub fn title(&self) -> String {
        self.overlay
            .descriptor()
            .map(|d| d.title.clone())
            .unwrap_or_default()
    }

    pub fn open(&mut self, descriptor: MediaDescriptor) -> bool {
        self.texture = None;
        self.overlay.open(descriptor, Instant::now())
    }

    pub fn close(&mut self, ctx: &egui::Context) {
        self.overlay.close();
        self.texture = None;
        if self.fullscreen {
            self.fullscreen = false;
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(false));
        }
        self.leave_mini_player(ctx);
    }

    fn enter_mini_player(&mut self, ctx: &egui::Context) {
        if self.mini_player.is_some() {
            return;
        }
        if self.fullscreen {
            self.fullscreen = false;
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(false));
        }
        let size = ctx
            .input(|i| i.viewport().inner_rect)
            .map(|r| r.size())
            .unwrap_or(egui::vec2(1280.0, 800.0));
        self.mini_player = Some(size);
        ctx.send_viewport_cmd(egui::ViewportCommand::WindowLevel(
            egui::WindowLevel::AlwaysOnTop,
        ));
        ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(MINI_PLAYER_SIZE));
    }

    fn leave_mini_player(&mut self, ctx: &egui::Context) {
        if let Some(size) = self.mini_player.take() {
            ctx.send_viewport_cmd(egui::ViewportCommand::WindowLevel(egui::WindowLevel::Normal));
            ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(size));
        }
    }

    /// Render the player UI
    pub fn show(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) -> PlayerAction {
        let now = Instant::now();
        self.overlay.on_time_update(now);
        self.overlay.tick(now);

        if let Some(frame) = self.overlay.element().take_frame() {
            let image = egui::ColorImage::from_rgb(
                [frame.width as usize, frame.height as usize],
                &frame.data,
            );
            self.texture = Some(ctx.load_texture(
                "video_frame",
                image,
                egui::TextureOptions::LINEAR,
            ));
        }

        if self.overlay.kind() == Some(MediaKind::Embed) {
            return self.show_embed(ui);
        }

        let mut action = PlayerAction::None;
        self.show_surface(ctx, ui, now);

        if let Some(prompt) = self.overlay.resume_prompt().cloned() {
            ui.separator();
            ui.horizontal(|ui| {
                ui.label(format!("Resume from {}?", prompt.at));
                if ui.button("Yes").clicked() {
                    self.overlay.accept_resume(now);
                }
                if ui.button("No").clicked() {
                    self.overlay.decline_resume(now);
                }
            });
        } else if self.overlay.controls_visible() {
            ui.separator();
            action = self.show_controls(ctx, ui, now);
        }

        if ui.input(|i| i.key_pressed(egui::Key::Space)) {
            self.overlay.toggle_play(now);
        }

        // Request continuous repaint while playing
        if self.overlay.state() == PlayerState::Playing {
            ctx.request_repaint();
        } else if let Some(due) = self.overlay.next_due() {
            ctx.request_repaint_after(due.saturating_duration_since(now));
        }
        action
    }

    fn show_embed(&mut self, ui: &mut egui::Ui) -> PlayerAction {
        let mut action = PlayerAction::None;
        ui.vertical_centered(|ui| {
            ui.add_space(40.0);
            ui.heading(self.title());
            ui.add_space(10.0);
            ui.label("This item plays in its own web player.");
            ui.add_space(10.0);
            if ui.button("🌐 Open externally").clicked() {
                if let Some(d) = self.overlay.descriptor() {
                    action = PlayerAction::OpenExternally(d.clone());
                }
            }
        });
        action
    }

    fn show_surface(&mut self, ctx: &egui::Context, ui: &mut egui::Ui, now: Instant) {
        let available = ui.available_size();
        let height = (available.y - 60.0).max(120.0);
        let (rect, response) =
            ui.allocate_exact_size(egui::vec2(available.x, height), egui::Sense::click());

        ui.painter().rect_filled(rect, 4.0, egui::Color32::BLACK);

        if let Some(ref texture) = self.texture {
            let tex_size = texture.size_vec2();
            let aspect = tex_size.x / tex_size.y;
            let (w, h) = if rect.width() / rect.height() > aspect {
                (rect.height() * aspect, rect.height())
            } else {
                (rect.width(), rect.width() / aspect)
            };
            let image_rect = egui::Rect::from_center_size(rect.center(), egui::vec2(w, h));
            ui.painter().image(
                texture.id(),
                image_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        } else {
            let status = if let Some(error) = self.overlay.element().last_error() {
                format!("Error: {}", error)
            } else if self.overlay.element().is_loading() {
                "Connecting to stream...".to_string()
            } else {
                self.title()
            };
            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                status,
                egui::FontId::proportional(16.0),
                egui::Color32::LIGHT_GRAY,
            );
        }

        if response.hovered() && ctx.input(|i| i.pointer.is_moving()) {
            self.overlay.on_pointer_activity(now);
        }
        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.overlay
                    .on_tap(pos.x - rect.left(), rect.width(), false, now);
            }
        }
    }

    fn show_controls(&mut self, ctx: &egui::Context, ui: &mut egui::Ui, now: Instant) -> PlayerAction {
        let mut action = PlayerAction::None;

        let mut fraction = self.overlay.progress();
        let slider = ui.add(
            egui::Slider::new(&mut fraction, 0.0..=1.0)
                .show_value(false)
                .trailing_fill(true),
        );
        if slider.dragged() || slider.changed() {
            self.overlay.begin_scrub(fraction);
        }
        if slider.drag_stopped() || (slider.changed() && !slider.dragged()) {
            self.overlay.commit_scrub(now);
        }

        ui.horizontal(|ui| {
            if ui.button("⏪ 10s").clicked() {
                self.overlay.skip_back(now);
            }
            let paused = matches!(
                self.overlay.state(),
                PlayerState::Paused | PlayerState::Ready | PlayerState::Ended
            );
            if ui.button(if paused { "▶ Play" } else { "⏸ Pause" }).clicked() {
                self.overlay.toggle_play(now);
            }
            if ui.button("10s ⏩").clicked() {
                self.overlay.skip_forward(now);
            }
            let muted = self.overlay.element().is_muted();
            if ui.button(if muted { "🔇" } else { "🔊" }).clicked() {
                self.overlay.toggle_mute();
            }

            let time = match self.overlay.scrub_preview() {
                Some(t) => format_time(t),
                None => self.overlay.time_label(),
            };
            ui.label(time);

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("✖ Close").clicked() {
                    self.close(ctx);
                    action = PlayerAction::Closed;
                }
                let controls = self.overlay.controls();
                if controls.fullscreen.is_some() {
                    let label = if self.fullscreen { "🗗 Exit fullscreen" } else { "⛶ Fullscreen" };
                    if ui.button(label).clicked() {
                        self.leave_mini_player(ctx);
                        self.fullscreen = !self.fullscreen;
                        ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(self.fullscreen));
                    }
                }
                if controls.picture_in_picture {
                    let label = if self.mini_player.is_some() { "🗖 Full size" } else { "🗕 Mini player" };
                    if ui.button(label).clicked() {
                        if self.mini_player.is_some() {
                            self.leave_mini_player(ctx);
                        } else {
                            self.enter_mini_player(ctx);
                        }
                    }
                }
                if controls.cast && ui.button("📡 Cast").clicked() {
                    if let Some(d) = self.overlay.descriptor().cloned() {
                        self.close(ctx);
                        action = PlayerAction::Cast(d);
                    }
                }
            });
        });
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::capabilities::{FullscreenTarget, TransportControls};

    #[test]
    fn test_desktop_controls() {
        let controls = TransportControls::from_capabilities(
            &DesktopProbe {
                external_player: true,
            }
            .probe(),
        );
        assert!(controls.picture_in_picture);
        assert!(controls.cast);
        assert_eq!(controls.fullscreen, Some(FullscreenTarget::Modal));

        let controls = TransportControls::from_capabilities(
            &DesktopProbe {
                external_player: false,
            }
            .probe(),
        );
        assert!(controls.picture_in_picture);
        assert!(!controls.cast);
    }
}
