use eframe::egui;
use egui_extras::{Column, TableBuilder};
use rust_s3ui::browser::{Browser, Command, Notification, PrefixTree, Scope};
use rust_s3ui::format;
use std::collections::VecDeque;
use std::time::Duration;

const REPAINT_INTERVAL: Duration = Duration::from_millis(100);
const ACTIVITY_LINES: usize = 50;

pub struct BrowserTab {
    browser: Option<Browser>,
    prefix: String,
    max_objects: String,
    search: String,
    /// Latest progress line of a running bulk action.
    transfer: Option<String>,
    link: Option<(String, String)>,
    confirm_delete: bool,
    activity: VecDeque<(egui::Color32, String)>,
}

impl BrowserTab {
    pub fn new() -> Self {
        Self {
            browser: None,
            prefix: String::new(),
            max_objects: String::new(),
            search: String::new(),
            transfer: None,
            link: None,
            confirm_delete: false,
            activity: VecDeque::new(),
        }
    }

    /// Replaces the current browser and starts listing `prefix`.
    pub fn attach(&mut self, mut browser: Browser, prefix: &str) {
        self.prefix = prefix.to_string();
        self.max_objects = browser.settings().max_objects.to_string();
        self.search.clear();
        self.transfer = None;
        self.link = None;
        self.activity.clear();
        browser.handle(Command::StartLoad {
            prefix: self.prefix.clone(),
            ceiling: browser.settings().ceiling(),
        });
        self.browser = Some(browser);
    }

    pub fn detach(&mut self) {
        self.browser = None;
        self.transfer = None;
        self.link = None;
    }

    pub fn status_line(&self) -> Option<String> {
        self.browser
            .as_ref()
            .map(|b| format!("{} | {}", b.status(), b.items_label()))
    }

    /// Applies background results. Called once per frame.
    pub fn pump(&mut self, ctx: &egui::Context) {
        let Some(browser) = self.browser.as_mut() else {
            return;
        };
        browser.pump();
        let notifications: Vec<_> = browser.drain_notifications().collect();
        let waiting = browser.is_loading()
            || browser.is_busy()
            || browser.view().search_term != self.search;
        for notification in notifications {
            self.on_notification(notification);
        }
        if waiting {
            ctx.request_repaint_after(REPAINT_INTERVAL);
        }
    }

    fn on_notification(&mut self, notification: Notification) {
        match notification {
            Notification::Progress(_) | Notification::SelectionChanged { .. } => {}
            Notification::Error(e) => self.log(egui::Color32::RED, format!("✗ {}", e)),
            Notification::Transfer {
                operation,
                key,
                transferred,
                total,
            } => {
                let amount = match total {
                    Some(total) if total > 0 => format!(
                        "{} of {} ({:.0}%)",
                        format::byte_count_si(transferred),
                        format::byte_count_si(total),
                        transferred as f64 * 100.0 / total as f64
                    ),
                    _ => format::byte_count_si(transferred),
                };
                self.transfer = Some(format!("{} {}: {}", operation, key, amount));
            }
            Notification::ItemDone { operation, key } => {
                self.log(egui::Color32::GREEN, format!("✓ {} {}", operation, key));
            }
            Notification::Link { key, url } => {
                self.link = Some((key, url.to_string()));
            }
            Notification::BulkFinished { operation, summary } => {
                self.transfer = None;
                let color = if summary.failed > 0 {
                    egui::Color32::YELLOW
                } else {
                    egui::Color32::GRAY
                };
                self.log(
                    color,
                    format!(
                        "{} finished: {} succeeded, {} failed",
                        operation, summary.succeeded, summary.failed
                    ),
                );
            }
        }
    }

    fn log(&mut self, color: egui::Color32, line: String) {
        if self.activity.len() == ACTIVITY_LINES {
            self.activity.pop_back();
        }
        self.activity.push_front((color, line));
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        ui.heading("Bucket Contents");
        ui.separator();

        let Some(browser) = self.browser.as_mut() else {
            ui.colored_label(egui::Color32::YELLOW, "⚠️ Connect to a profile first");
            return;
        };

        let mut commands = Vec::new();

        ui.horizontal(|ui| {
            ui.label("Prefix:");
            let prefix = ui.text_edit_singleline(&mut self.prefix);
            ui.label("Max objects:");
            ui.add(egui::TextEdit::singleline(&mut self.max_objects).desired_width(80.0));

            let enter = prefix.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("🔄 Load").clicked() || enter {
                // Unparseable input falls back to the configured limit.
                let ceiling = match self.max_objects.trim().parse::<usize>() {
                    Ok(0) => None,
                    Ok(max) => Some(max),
                    Err(_) => browser.settings().ceiling(),
                };
                self.search.clear();
                commands.push(Command::StartLoad {
                    prefix: self.prefix.clone(),
                    ceiling,
                });
            }
            if ui
                .add_enabled(browser.has_more() && !browser.is_loading(), egui::Button::new("⏬ Load More"))
                .clicked()
            {
                commands.push(Command::ContinueLoad);
            }
            if ui
                .add_enabled(browser.is_loading(), egui::Button::new("⏹ Stop"))
                .clicked()
            {
                commands.push(Command::CancelLoad);
            }
            if browser.is_loading() {
                ui.spinner();
            }
        });

        ui.horizontal(|ui| {
            ui.label("Search:");
            if ui.text_edit_singleline(&mut self.search).changed() {
                commands.push(Command::SetSearchTerm(self.search.clone()));
            }

            ui.separator();

            if ui.button("⬆️ Upload…").clicked() {
                if let Some(path) = rfd::FileDialog::new().pick_file() {
                    commands.push(Command::UploadFile {
                        local_path: path,
                        destination_prefix: None,
                    });
                }
            }

            let selected = browser.selection().count();
            ui.add_enabled_ui(selected > 0, |ui| {
                if ui.button(format!("⬇️ Download ({})", selected)).clicked() {
                    if let Some(folder) = rfd::FileDialog::new().pick_folder() {
                        commands.push(Command::DownloadSelected(folder));
                    }
                }
                if ui.button(format!("🗑️ Delete ({})", selected)).clicked() {
                    self.confirm_delete = true;
                }
            });
        });

        let selected = browser.selection().count();
        if self.confirm_delete && selected > 0 {
            let mut answered = false;
            egui::Window::new("Delete Objects")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ui.ctx(), |ui| {
                    ui.label(delete_prompt(selected));
                    ui.horizontal(|ui| {
                        if ui.button("Yes").clicked() {
                            commands.push(Command::DeleteSelected);
                            answered = true;
                        }
                        if ui.button("No").clicked() {
                            answered = true;
                        }
                    });
                });
            if answered {
                self.confirm_delete = false;
            }
        } else {
            self.confirm_delete = false;
        }

        if let Some(line) = &self.transfer {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(line);
            });
        }

        if let Some((key, url)) = &self.link {
            let mut close = false;
            ui.group(|ui| {
                ui.horizontal(|ui| {
                    ui.strong(format!("Link for {}", key));
                    if ui.small_button("📋 Copy").clicked() {
                        ui.output_mut(|o| o.copied_text = url.clone());
                    }
                    if ui.small_button("✖").clicked() {
                        close = true;
                    }
                });
                ui.add(
                    egui::TextEdit::singleline(&mut url.as_str())
                        .desired_width(f32::INFINITY),
                );
            });
            if close {
                self.link = None;
            }
        }

        ui.label(browser.items_label());
        ui.separator();

        egui::SidePanel::left("prefix_tree")
            .resizable(true)
            .default_width(220.0)
            .show_inside(ui, |ui| {
                egui::ScrollArea::vertical().id_salt("tree").show(ui, |ui| {
                    let current = &browser.view().scope;
                    let mut picked = None;
                    for root in browser.tree().roots() {
                        tree_node(ui, browser.tree(), &root, current, &mut picked);
                    }
                    if let Some(scope) = picked {
                        commands.push(Command::SelectScope(scope));
                    }
                });
            });

        egui::TopBottomPanel::bottom("activity")
            .resizable(true)
            .default_height(90.0)
            .show_inside(ui, |ui| {
                egui::ScrollArea::vertical().id_salt("activity_log").show(ui, |ui| {
                    for (color, line) in &self.activity {
                        ui.colored_label(*color, line);
                    }
                });
            });

        egui::CentralPanel::default().show_inside(ui, |ui| {
            if browser.visible_len() == 0 && !browser.is_loading() {
                ui.label("No objects to show");
                return;
            }
            object_table(ui, &*browser, &mut commands);
        });

        for command in commands {
            browser.handle(command);
        }
    }
}

fn delete_prompt(count: usize) -> String {
    if count == 1 {
        "Do you really want to delete this file?".to_string()
    } else {
        format!("Do you really want to delete '{}' files?", count)
    }
}

fn tree_node(
    ui: &mut egui::Ui,
    tree: &PrefixTree,
    node: &Scope,
    current: &Scope,
    picked: &mut Option<Scope>,
) {
    let label = tree.label(node).unwrap_or_default();
    let text = if node == current {
        egui::RichText::new(label).strong()
    } else {
        egui::RichText::new(label)
    };

    if !tree.is_branch(node) {
        if ui.selectable_label(node == current, text).clicked() {
            *picked = Some(node.clone());
        }
        return;
    }

    let response = egui::CollapsingHeader::new(text)
        .id_salt(node)
        .default_open(*node == Scope::Root)
        .show(ui, |ui| {
            for child in tree.children(node) {
                tree_node(ui, tree, child, current, picked);
            }
        });
    if response.header_response.clicked() {
        *picked = Some(node.clone());
    }
}

fn object_table(ui: &mut egui::Ui, browser: &Browser, commands: &mut Vec<Command>) {
    TableBuilder::new(ui)
        .striped(true)
        .column(Column::exact(24.0))
        .column(Column::initial(480.0).resizable(true).clip(true))
        .column(Column::initial(90.0).resizable(true))
        .column(Column::initial(150.0).resizable(true))
        .column(Column::remainder())
        .header(22.0, |mut header| {
            header.col(|_| {});
            header.col(|ui| {
                ui.strong("Key");
            });
            header.col(|ui| {
                ui.strong("Size");
            });
            header.col(|ui| {
                ui.strong("Last Modified");
            });
            header.col(|ui| {
                ui.strong("Link");
            });
        })
        .body(|body| {
            body.rows(20.0, browser.visible_len(), |mut row| {
                let index = row.index();
                let Some(object) = browser.visible(index) else {
                    return;
                };
                row.col(|ui| {
                    let mut selected = browser.selection().is_selected(index);
                    if ui.checkbox(&mut selected, "").changed() {
                        commands.push(Command::ToggleSelect(index));
                    }
                });
                row.col(|ui| {
                    ui.label(&object.key);
                });
                row.col(|ui| {
                    ui.label(format::byte_count_si(object.size));
                });
                row.col(|ui| {
                    ui.label(format::timestamp(&object.last_modified));
                });
                row.col(|ui| {
                    if ui.small_button("🔗").on_hover_text("Get link").clicked() {
                        commands.push(Command::GetLink { row: index, expiry: None });
                    }
                });
            });
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_prompt_names_the_count() {
        assert_eq!(delete_prompt(1), "Do you really want to delete this file?");
        assert_eq!(delete_prompt(3), "Do you really want to delete '3' files?");
    }
}
