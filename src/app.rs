// ============================================================================
// ChannelFE APP — egui front-end over the edit pipeline
// ============================================================================
//
// The UI never touches pixels: it feeds shift/swap parameters into the
// pipeline, requests one render per parameter change, and uploads the
// result as the preview texture.

use eframe::egui;
use egui::{Color32, ColorImage, Rect, Sense, TextureHandle, TextureOptions, pos2};

use crate::io::{FileHandler, SaveFormat, encode_and_write, load_image_sync};
use crate::ops::channels::ChannelIndex;
use crate::pipeline::EditPipeline;
use crate::{log_err, log_info};

pub struct ChannelFEApp {
    pipeline: EditPipeline,
    file_handler: FileHandler,

    /// Name of the loaded file, shown in the window title.
    source_name: Option<String>,

    /// Preview texture; rebuilt whenever `preview_dirty` is set.
    preview: Option<TextureHandle>,
    preview_dirty: bool,

    /// Last load/save outcome shown in the toolbar.
    status: String,
}

impl ChannelFEApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self {
            pipeline: EditPipeline::new(),
            file_handler: FileHandler::new(),
            source_name: None,
            preview: None,
            preview_dirty: false,
            status: String::from("Open an image to start."),
        }
    }

    fn open_image(&mut self) {
        let Some(path) = self.file_handler.pick_open() else {
            return;
        };
        match load_image_sync(&path).and_then(|img| {
            self.pipeline.load_image(&img)?;
            Ok(img.dimensions())
        }) {
            Ok((w, h)) => {
                self.source_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned());
                self.preview_dirty = true;
                self.status = format!("Loaded {}×{}", w, h);
                log_info!("Loaded \"{}\" ({}×{})", path.display(), w, h);
            }
            Err(e) => {
                self.status = format!("Load failed: {}", e);
                log_err!("Load failed for \"{}\": {}", path.display(), e);
            }
        }
    }

    fn save_render(&mut self) {
        let Some(rendered) = self.pipeline.render() else {
            return;
        };
        let Some(path) = self.file_handler.pick_save(SaveFormat::Png) else {
            return;
        };
        let format = SaveFormat::parse(
            path.extension().and_then(|e| e.to_str()).unwrap_or("png"),
        );
        match encode_and_write(&rendered, &path, format) {
            Ok(()) => {
                self.status = format!("Saved {}", path.display());
                log_info!("Saved render → {}", path.display());
            }
            Err(e) => {
                self.status = format!("Save failed: {}", e);
                log_err!("Save failed for \"{}\": {}", path.display(), e);
            }
        }
    }

    /// Re-render the preview and upload it as an egui texture.
    fn refresh_preview(&mut self, ctx: &egui::Context) {
        let Some(rendered) = self.pipeline.render() else {
            self.preview = None;
            return;
        };
        let size = [rendered.width() as usize, rendered.height() as usize];
        let color_image = ColorImage::from_rgba_unmultiplied(size, rendered.as_raw());
        match &mut self.preview {
            Some(texture) => texture.set(color_image, TextureOptions::NEAREST),
            None => {
                self.preview =
                    Some(ctx.load_texture("preview", color_image, TextureOptions::NEAREST));
            }
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Open…").clicked() {
                self.open_image();
            }
            if ui
                .add_enabled(self.pipeline.is_loaded(), egui::Button::new("Save…"))
                .clicked()
            {
                self.save_render();
            }
            ui.separator();
            if ui
                .add_enabled(self.pipeline.modified(), egui::Button::new("Confirm"))
                .clicked()
            {
                self.pipeline.confirm();
                self.preview_dirty = true;
                self.status = String::from("Confirmed: preview committed as the new baseline.");
            }
            if ui
                .add_enabled(self.pipeline.modified(), egui::Button::new("Reset"))
                .clicked()
            {
                self.pipeline.reset();
                self.preview_dirty = true;
                self.status = String::from("Edit parameters reset.");
            }
            ui.separator();
            ui.label(&self.status);
        });
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        let Some((width, height)) = self.pipeline.dimensions() else {
            ui.label("No image loaded.");
            return;
        };

        ui.heading("Channel shift");
        for channel in ChannelIndex::all() {
            ui.separator();
            ui.label(channel.label());
            let shift = self.pipeline.shift(channel);
            let mut dx = shift.dx;
            let mut dy = shift.dy;
            // Slider range is [0, dimension] inclusive — a full-dimension
            // shift wraps back to the identity.
            let changed = ui
                .add(egui::Slider::new(&mut dx, 0..=width).text("X"))
                .changed()
                | ui.add(egui::Slider::new(&mut dy, 0..=height).text("Y"))
                    .changed();
            if changed {
                self.pipeline.set_shift(channel, dx, dy);
                self.preview_dirty = true;
            }
        }

        ui.separator();
        ui.heading("Channel swap");
        let selection = self.pipeline.selection();
        let mut source = selection.source;
        let mut target = selection.target;
        let mut changed = false;
        egui::ComboBox::from_label("Source")
            .selected_text(source.label())
            .show_ui(ui, |ui| {
                for ch in ChannelIndex::all() {
                    changed |= ui.selectable_value(&mut source, ch, ch.label()).changed();
                }
            });
        egui::ComboBox::from_label("Target")
            .selected_text(target.label())
            .show_ui(ui, |ui| {
                for ch in ChannelIndex::all() {
                    changed |= ui.selectable_value(&mut target, ch, ch.label()).changed();
                }
            });
        if changed {
            self.pipeline.set_selection(source, target);
            self.preview_dirty = true;
        }
        if source == target {
            ui.small("Same channel selected: no swap applied.");
        }
    }

    fn preview_panel(&mut self, ui: &mut egui::Ui) {
        let Some(texture) = &self.preview else {
            ui.centered_and_justified(|ui| {
                ui.label("Preview appears here.");
            });
            return;
        };

        // Fit the image into the available space, preserving aspect ratio.
        let tex_size = texture.size_vec2();
        let avail = ui.available_size();
        let scale = (avail.x / tex_size.x).min(avail.y / tex_size.y).min(8.0);
        let display = tex_size * scale;

        let (rect, _) = ui.allocate_exact_size(avail, Sense::hover());
        let image_rect = Rect::from_center_size(rect.center(), display);
        let uv = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));
        ui.painter()
            .image(texture.id(), image_rect, uv, Color32::WHITE);
    }
}

impl eframe::App for ChannelFEApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Dynamic window title: "ChannelFE - <file>[*]"
        {
            let title = match &self.source_name {
                Some(name) => {
                    let dirty = if self.pipeline.modified() { "*" } else { "" };
                    format!("ChannelFE - {}{}", name, dirty)
                }
                None => String::from("ChannelFE"),
            };
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title));
        }

        // One render per parameter batch: all widget changes for this frame
        // have been applied before the texture is rebuilt.
        if self.preview_dirty {
            self.preview_dirty = false;
            self.refresh_preview(ctx);
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar(ui);
        });
        egui::SidePanel::left("controls")
            .min_width(230.0)
            .show(ctx, |ui| {
                self.controls(ui);
            });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.preview_panel(ui);
        });
    }
}
