//! A tray icon with a context menu covering every item kind.
//!
//! Right-click the icon to open the menu, double-click it for a balloon tip.

use std::sync::mpsc;
use std::time::Duration;

use cross_tray::{
    BalloonIcon, BalloonTip, Bitmap, BitmapSource, ClickTypes, MenuItem, TrayAttributes,
    TrayEvent, TrayManager,
};
use tracing::{info, warn};

fn square(size: u32, rgba: [u8; 4]) -> BitmapSource {
    BitmapSource::Rgba {
        data: rgba.repeat((size * size) as usize),
        width: size,
        height: size,
    }
}

fn gradient_icon(size: u32) -> anyhow::Result<Bitmap> {
    let mut data = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let r = (x * 255 / size) as u8;
            let b = (y * 255 / size) as u8;
            data.extend_from_slice(&[r, 96, b, 255]);
        }
    }
    Ok(Bitmap::from_rgba(data, size, size)?)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let (exit_tx, exit_rx) = mpsc::channel();

    let menu = vec![
        MenuItem::simple("Say hello", |_| info!("Hello from the tray")),
        MenuItem::checkable("Notifications", true, |item| {
            info!(checked = ?item.checked(), "Notifications toggled");
        }),
        MenuItem::icon("Status", square(16, [40, 200, 80, 255]), |item| {
            item.set_text("Status (seen)");
        })?,
        MenuItem::popup(
            "More",
            vec![
                MenuItem::simple("About", |_| info!("cross_tray demo")),
                MenuItem::separator(),
                MenuItem::custom_checkable(
                    "Do not disturb",
                    false,
                    square(16, [220, 40, 40, 255]),
                    square(16, [120, 120, 120, 255]),
                    |item| info!(checked = ?item.checked(), "Do not disturb toggled"),
                )?,
                MenuItem::simple("Unavailable", |_| {}).enabled(false),
                MenuItem::popup("Empty", Vec::new()),
            ],
        ),
        MenuItem::separator(),
        MenuItem::simple("Exit", move |_| {
            let _ = exit_tx.send(());
        }),
    ];

    let manager = TrayManager::new();
    let tray = manager.create_tray(
        TrayAttributes::default()
            .with_tooltip("cross_tray demo")
            .with_class_name("CrossTrayDemo")
            .with_icon(Some(gradient_icon(32)?))
            .with_menu(menu)
            .with_menu_on_click(ClickTypes::RIGHT),
    )?;

    tray.show_balloon_tip(
        BalloonTip::new("cross_tray", "Right-click the icon for the menu").with_icon(BalloonIcon::Info),
    )?;

    loop {
        if exit_rx.try_recv().is_ok() {
            info!("Exit selected");
            break;
        }

        match manager.recv_timeout(Duration::from_millis(100)) {
            Ok((id, TrayEvent::Gesture { clicks, position })) => {
                info!(?id, ?clicks, ?position, "Tray gesture");
                if clicks.contains(ClickTypes::DOUBLE_LEFT) {
                    if let Err(e) = tray.show_balloon_tip(BalloonTip::new("Hi", "Double click!")) {
                        warn!("Failed to show balloon: {e:#}");
                    }
                }
            }
            Ok((id, TrayEvent::MenuCommand { id: command })) => {
                info!(?id, command, "Menu command");
            }
            Ok(_) => {}
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    tray.shutdown();
    Ok(())
}
