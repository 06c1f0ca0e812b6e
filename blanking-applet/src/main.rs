use std::sync::Arc;
use std::time::{Duration, Instant};

use blanking_core::{
    Applet, BlankingMode, Config, FileStore, InhibitDuration, MceService, MemoryStore,
    SettingsStore,
};
use iced::widget::{button, column, container, row, slider, text, toggler};
use iced::{Element, Subscription, Task, Theme};
use log::warn;

pub fn main() -> iced::Result {
    env_logger::init();

    iced::application(BlankingApp::default, BlankingApp::update, BlankingApp::view)
        .title("Display blanking")
        .subscription(BlankingApp::subscription)
        .theme(BlankingApp::theme)
        .run()
}

/// A modal dialog; while open it is the only thing shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialog {
    Modes,
    Duration { hours: i32, minutes: i32 },
}

struct BlankingApp {
    applet: Option<Applet>,
    error_message: Option<String>,
    dialog: Option<Dialog>,
}

#[derive(Debug, Clone)]
enum Message {
    // Blanking mode
    OpenModePicker,
    ModePicked(usize),
    CycleMode,

    // Inhibition toggles
    InhibitNow(bool),
    InhibitTimed(bool),

    // Duration dialog
    HoursChanged(i32),
    MinutesChanged(i32),
    ConfirmDuration,
    CancelDuration,

    Tick,
}

fn open_store(config: &Config) -> Arc<dyn SettingsStore> {
    let Some(path) = config.store_path.as_ref() else {
        return Arc::new(MemoryStore::new());
    };
    match FileStore::open(path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(
                "cannot open settings at {}, changes will not persist: {}",
                path.display(),
                e
            );
            Arc::new(MemoryStore::new())
        }
    }
}

impl Default for BlankingApp {
    fn default() -> Self {
        let mut app = Self {
            applet: None,
            error_message: None,
            dialog: None,
        };

        let config = Config::load();
        let store = open_store(&config);

        match MceService::connect() {
            Ok(power) => {
                app.applet = Some(Applet::new(store, Arc::new(power), &config));
            }
            Err(e) => {
                app.error_message = Some(format!("Failed to initialize: {}", e));
            }
        }

        app
    }
}

impl BlankingApp {
    fn update(&mut self, message: Message) -> Task<Message> {
        let now = Instant::now();
        let Some(applet) = self.applet.as_mut() else {
            return Task::none();
        };

        if !matches!(message, Message::Tick) {
            self.error_message = None;
        }

        match message {
            Message::OpenModePicker => {
                self.dialog = Some(Dialog::Modes);
            }

            Message::ModePicked(row) => {
                self.dialog = None;
                if let Err(e) = applet.choose_mode(row, now) {
                    self.error_message = Some(format!("Mode error: {}", e));
                }
            }

            Message::CycleMode => {
                if let Err(e) = applet.cycle_mode(now) {
                    self.error_message = Some(format!("Mode error: {}", e));
                }
            }

            Message::InhibitNow(active) => {
                applet.set_inhibit_now(active, now);
            }

            Message::InhibitTimed(true) => {
                let defaults = applet.open_timed_dialog();
                self.dialog = Some(Dialog::Duration {
                    hours: defaults.hours().into(),
                    minutes: defaults.minutes().into(),
                });
            }

            Message::InhibitTimed(false) => {
                if applet.inhibition().is_timed() {
                    applet.stop_inhibit();
                }
            }

            Message::HoursChanged(value) => {
                if let Some(Dialog::Duration { hours, .. }) = self.dialog.as_mut() {
                    *hours = value;
                }
            }

            Message::MinutesChanged(value) => {
                if let Some(Dialog::Duration { minutes, .. }) = self.dialog.as_mut() {
                    *minutes = value;
                }
            }

            Message::ConfirmDuration => {
                if let Some(Dialog::Duration { hours, minutes }) = self.dialog.take() {
                    match InhibitDuration::from_settings(hours, minutes) {
                        Ok(duration) => applet.confirm_timed(duration, now),
                        Err(e) => self.error_message = Some(format!("Duration error: {}", e)),
                    }
                }
            }

            // The timed toggle is drawn from the inhibition state, so it
            // reverts on its own.
            Message::CancelDuration => {
                self.dialog = None;
                applet.cancel_timed();
            }

            Message::Tick => {
                applet.tick(now);
            }
        }

        Task::none()
    }

    fn view(&self) -> Element<'_, Message> {
        let Some(applet) = self.applet.as_ref() else {
            let msg = self.error_message.clone().unwrap_or_default();
            return container(text(msg).size(14)).padding(20).into();
        };

        match self.dialog {
            Some(Dialog::Modes) => return mode_picker(),
            Some(Dialog::Duration { hours, minutes }) => return duration_picker(hours, minutes),
            None => {}
        }

        let now = Instant::now();

        // Error/banner message
        let status = match (&self.error_message, applet.banner(now)) {
            (Some(msg), _) => text(msg.clone()).size(14),
            (None, Some(banner)) => text(banner.text.clone()).size(14),
            (None, None) => text("").size(14),
        };

        let indicator = match applet.status_icon() {
            Some(_) => text("Blanking inhibited").size(12),
            None => text("").size(12),
        };

        let mode = applet.mode();
        let mode_button = button(
            column![
                text(applet.button_title()).size(16),
                text(mode.description()).size(14),
            ]
            .spacing(2),
        )
        .on_press(Message::OpenModePicker);

        let state = applet.inhibition();
        let timed_label = match state.remaining(now) {
            Some(left) => format!("Inhibit blanking for a while ({} left)", format_remaining(left)),
            None => "Inhibit blanking for a while".to_string(),
        };

        let toggles = column![
            toggler(state.is_indefinite())
                .label("Inhibit blanking now")
                .on_toggle(Message::InhibitNow),
            toggler(state.is_timed())
                .label(timed_label)
                .on_toggle(Message::InhibitTimed),
        ]
        .spacing(10);

        let content = column![
            row![indicator].spacing(5),
            status,
            row![mode_button, button("Next").on_press(Message::CycleMode)].spacing(10),
            toggles,
        ]
        .spacing(15)
        .padding(20);

        container(content).into()
    }

    fn subscription(&self) -> Subscription<Message> {
        iced::time::every(Duration::from_secs(1)).map(|_| Message::Tick)
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn mode_picker<'a>() -> Element<'a, Message> {
    let mut list = column![text("Display blanking mode").size(18)].spacing(8);
    for (row, mode) in BlankingMode::ALL.iter().enumerate() {
        list = list.push(
            button(column![text(mode.title()).size(16), text(mode.description()).size(12)])
                .on_press(Message::ModePicked(row)),
        );
    }
    list = list.push(button("Cancel").on_press(Message::ModePicked(BlankingMode::COUNT)));
    container(list.padding(20)).into()
}

fn duration_picker<'a>(hours: i32, minutes: i32) -> Element<'a, Message> {
    let content = column![
        text("Inhibit display blanking for").size(18),
        text(format!("Hours: {}", hours)).size(14),
        slider(0..=i32::from(InhibitDuration::MAX_HOURS), hours, Message::HoursChanged).step(1),
        text(format!("Minutes: {}", minutes)).size(14),
        slider(
            0..=i32::from(InhibitDuration::MAX_MINUTES),
            minutes,
            Message::MinutesChanged
        )
        .step(i32::from(InhibitDuration::MINUTE_STEP)),
        row![
            button("Cancel").on_press(Message::CancelDuration),
            button("Done").on_press(Message::ConfirmDuration),
        ]
        .spacing(10),
    ]
    .spacing(10)
    .padding(20);

    container(content).into()
}

fn format_remaining(left: Duration) -> String {
    let secs = left.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}
