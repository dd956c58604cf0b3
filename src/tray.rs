use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cross_tray_core::{
    BackendEvent, BalloonTip, Bitmap, ClickTypes, ContextMenu, IconState, MenuItem,
    NotifyBackend, TrayAttributes, TrayError, TrayEvent, TrayId, TrayProxy, Waker,
};
use dpi::PhysicalPosition;
use tracing::{debug, error, trace, warn};

type Reply = Sender<anyhow::Result<()>>;

/// Requests from a [`TrayIcon`] to its event pump.
enum TrayCommand {
    Mount(Reply),
    Unmount(Reply),
    Refresh(Reply),
    SetTooltip(String, Reply),
    SetIcon(Option<Arc<Bitmap>>, Reply),
    Balloon(BalloonTip, Reply),
    Stop,
}

pub struct TrayManager {
    receiver: Receiver<(TrayId, TrayEvent)>,
    callback_proxy: TrayProxy,
}

impl std::fmt::Debug for TrayManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrayManager")
            .field("receiver", &"<...>")
            .field("sender", &"<...>")
            .finish()
    }
}

impl Default for TrayManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TrayManager {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        TrayManager {
            callback_proxy: Arc::new(move |id, event| {
                if let Err(e) = sender.send((id, event)) {
                    trace!("Dropping tray event, receiver is gone: {e}");
                }
            }),
            receiver,
        }
    }

    /// Create a tray icon in the Windows notification area.
    #[cfg(target_os = "windows")]
    pub fn create_tray(&self, attr: TrayAttributes) -> anyhow::Result<TrayIcon> {
        let class_name = attr.class_name.clone();
        self.create_tray_with(attr, move || {
            cross_tray_windows::NotifyIcon::new(&class_name)
        })
    }

    #[cfg(not(target_os = "windows"))]
    pub fn create_tray(&self, _attr: TrayAttributes) -> anyhow::Result<TrayIcon> {
        anyhow::bail!("no notification area backend is available on this platform")
    }

    /// Create a tray icon on a backend built by `factory`.
    ///
    /// `factory` runs on the new event pump thread, which owns the backend from then on.
    pub fn create_tray_with<B, F>(&self, attr: TrayAttributes, factory: F) -> anyhow::Result<TrayIcon>
    where
        B: NotifyBackend + 'static,
        F: FnOnce() -> anyhow::Result<B> + Send + 'static,
    {
        TrayIcon::spawn(attr, self.callback_proxy.clone(), factory)
    }

    pub fn recv(&self) -> Result<(TrayId, TrayEvent), mpsc::RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<(TrayId, TrayEvent), mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<(TrayId, TrayEvent), mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// An icon in the notification area with a context menu.
///
/// The icon is driven by a background event pump thread. Menu actions run on that
/// thread while the menu is locked: requests made from inside an action fail with
/// [`TrayError::Reentrant`], and dropping the `TrayIcon` there stops the pump once the
/// action returns.
pub struct TrayIcon {
    id: TrayId,
    menu: ContextMenu,
    commands: Sender<TrayCommand>,
    waker: Waker,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for TrayIcon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrayIcon")
            .field("id", &self.id)
            .field("menu", &self.menu)
            .field("running", &self.thread.is_some())
            .finish_non_exhaustive()
    }
}

impl TrayIcon {
    fn spawn<B, F>(attr: TrayAttributes, proxy: TrayProxy, factory: F) -> anyhow::Result<Self>
    where
        B: NotifyBackend + 'static,
        F: FnOnce() -> anyhow::Result<B> + Send + 'static,
    {
        let id = TrayId::next();
        let menu = ContextMenu::new();
        if let Some(items) = attr.menu {
            menu.replace(items);
        }

        let (commands, command_rx) = mpsc::channel();
        let (init_tx, init_rx) = mpsc::sync_channel::<anyhow::Result<Waker>>(1);

        let pump_menu = menu.clone();
        let state = IconState {
            tooltip: attr.tooltip,
            icon: attr.icon.map(Arc::new),
        };
        let menu_on_click = attr.menu_on_click;
        let mount_on_start = attr.mount_on_start;

        let thread = thread::Builder::new()
            .name(format!("cross-tray-{}", id.into_raw()))
            .spawn(move || {
                let backend = match factory() {
                    Ok(backend) => backend,
                    Err(e) => {
                        let _ = init_tx.send(Err(e));
                        return;
                    }
                };

                let mut pump = Pump {
                    id,
                    backend,
                    menu: pump_menu,
                    commands: command_rx,
                    proxy,
                    state,
                    mounted: false,
                    menu_on_click,
                };

                if mount_on_start {
                    if let Err(e) = pump.mount() {
                        let _ = init_tx.send(Err(e));
                        return;
                    }
                }

                if init_tx.send(Ok(pump.backend.waker())).is_err() {
                    return;
                }
                pump.run();
            })?;

        let waker = match init_rx.recv() {
            Ok(Ok(waker)) => waker,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(TrayError::PumpStopped.into());
            }
        };

        debug!(?id, "Created tray icon");
        Ok(TrayIcon {
            id,
            menu,
            commands,
            waker,
            thread: Some(thread),
        })
    }

    pub fn id(&self) -> TrayId {
        self.id
    }

    /// The live context menu, for inspecting items or dispatching commands directly.
    pub fn menu(&self) -> &ContextMenu {
        &self.menu
    }

    /// Replace the context menu with `items`.
    ///
    /// Identifiers are reassigned from 1. The previous items and their bitmaps are
    /// released; a selection still pending on the old menu is ignored.
    pub fn create_context_menu(&self, items: Vec<MenuItem>) {
        self.menu.replace(items);
    }

    pub fn set_tooltip(&self, tooltip: impl Into<String>) -> anyhow::Result<()> {
        let tooltip = tooltip.into();
        self.request(|reply| TrayCommand::SetTooltip(tooltip, reply))
    }

    /// Replace the icon image. `None` restores the application's default icon.
    pub fn set_icon(&self, icon: Option<Bitmap>) -> anyhow::Result<()> {
        let icon = icon.map(Arc::new);
        self.request(|reply| TrayCommand::SetIcon(icon, reply))
    }

    /// Show a balloon notification. Fails with [`TrayError::NotMounted`] if the icon is
    /// not in the notification area.
    pub fn show_balloon_tip(&self, tip: BalloonTip) -> anyhow::Result<()> {
        self.request(|reply| TrayCommand::Balloon(tip, reply))
    }

    /// Add the icon to the notification area. Does nothing if it is already there.
    pub fn mount_icon(&self) -> anyhow::Result<()> {
        self.request(TrayCommand::Mount)
    }

    /// Remove the icon from the notification area. Does nothing if it is not there.
    pub fn unmount_icon(&self) -> anyhow::Result<()> {
        self.request(TrayCommand::Unmount)
    }

    /// Push the current icon and tooltip to the notification area again.
    pub fn refresh_icon(&self) -> anyhow::Result<()> {
        self.request(TrayCommand::Refresh)
    }

    fn request(&self, make: impl FnOnce(Reply) -> TrayCommand) -> anyhow::Result<()> {
        let Some(thread) = &self.thread else {
            return Err(TrayError::PumpStopped.into());
        };
        if thread.thread().id() == thread::current().id() {
            return Err(TrayError::Reentrant.into());
        }

        let (reply, response) = mpsc::channel();
        self.commands
            .send(make(reply))
            .map_err(|_| TrayError::PumpStopped)?;
        (self.waker)();
        response.recv().map_err(|_| TrayError::PumpStopped)?
    }

    /// Release the menu, remove the icon and stop the event pump.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(handle) = self.thread.take() else {
            return;
        };
        debug!(id = ?self.id, "Shutting down tray icon");

        // On the pump thread the menu lock is held by the dispatching action, so the
        // pump releases the menu itself when it sees `Stop`.
        if handle.thread().id() == thread::current().id() {
            let _ = self.commands.send(TrayCommand::Stop);
            (self.waker)();
            debug!("Tray icon dropped on its own event thread, not waiting for it");
            return;
        }

        self.menu.clear();
        let _ = self.commands.send(TrayCommand::Stop);
        (self.waker)();

        let timeout = Duration::from_millis(500);
        let start = Instant::now();
        while !handle.is_finished() && start.elapsed() < timeout {
            thread::sleep(Duration::from_millis(10));
        }

        if handle.is_finished() {
            if handle.join().is_err() {
                error!("Tray event thread panicked");
            } else {
                debug!("Tray event thread cleaned up successfully");
            }
        } else {
            warn!("Tray event thread did not exit cleanly within timeout");
        }
    }
}

impl Drop for TrayIcon {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State owned by the event pump thread.
struct Pump<B: NotifyBackend> {
    id: TrayId,
    backend: B,
    menu: ContextMenu,
    commands: Receiver<TrayCommand>,
    proxy: TrayProxy,
    state: IconState,
    mounted: bool,
    menu_on_click: ClickTypes,
}

impl<B: NotifyBackend> Pump<B> {
    fn run(mut self) {
        trace!(id = ?self.id, "Starting tray event pump");

        loop {
            let Some(event) = self.backend.next_event() else {
                debug!("Tray backend closed");
                break;
            };

            if self.drain_commands().is_break() {
                break;
            }

            match event {
                BackendEvent::Wake => {}
                BackendEvent::Tray(event) => self.handle_event(event),
            }
        }

        if self.mounted {
            if let Err(e) = self.unmount() {
                warn!("Failed to remove tray icon: {e:#}");
            }
        }
        debug!(id = ?self.id, "Tray event pump exiting");
    }

    fn drain_commands(&mut self) -> ControlFlow<()> {
        loop {
            let command = match self.commands.try_recv() {
                Ok(command) => command,
                Err(mpsc::TryRecvError::Empty) => return ControlFlow::Continue(()),
                Err(mpsc::TryRecvError::Disconnected) => return ControlFlow::Break(()),
            };

            let (result, reply) = match command {
                TrayCommand::Stop => {
                    self.menu.clear();
                    return ControlFlow::Break(());
                }
                TrayCommand::Mount(reply) => (self.mount(), reply),
                TrayCommand::Unmount(reply) => (self.unmount(), reply),
                TrayCommand::Refresh(reply) => (self.refresh(), reply),
                TrayCommand::SetTooltip(tooltip, reply) => (self.set_tooltip(tooltip), reply),
                TrayCommand::SetIcon(icon, reply) => (self.set_icon(icon), reply),
                TrayCommand::Balloon(tip, reply) => (self.show_balloon(&tip), reply),
            };

            if let Err(e) = &result {
                debug!("Tray request failed: {e:#}");
            }
            let _ = reply.send(result);
        }
    }

    fn mount(&mut self) -> anyhow::Result<()> {
        if self.mounted {
            return Ok(());
        }
        self.backend.add_icon(&self.state)?;
        self.mounted = true;
        debug!(id = ?self.id, "Mounted tray icon");
        Ok(())
    }

    fn unmount(&mut self) -> anyhow::Result<()> {
        if !self.mounted {
            return Ok(());
        }
        self.mounted = false;
        self.backend.remove_icon()?;
        debug!(id = ?self.id, "Unmounted tray icon");
        Ok(())
    }

    fn refresh(&mut self) -> anyhow::Result<()> {
        if !self.mounted {
            return Err(TrayError::NotMounted.into());
        }
        self.backend.modify_icon(&self.state)
    }

    fn set_tooltip(&mut self, tooltip: String) -> anyhow::Result<()> {
        self.state.tooltip = tooltip;
        if self.mounted {
            self.backend.modify_tooltip(&self.state.tooltip)?;
        }
        Ok(())
    }

    fn set_icon(&mut self, icon: Option<Arc<Bitmap>>) -> anyhow::Result<()> {
        self.state.icon = icon;
        if self.mounted {
            self.backend.modify_icon(&self.state)?;
        }
        Ok(())
    }

    fn show_balloon(&mut self, tip: &BalloonTip) -> anyhow::Result<()> {
        if !self.mounted {
            return Err(TrayError::NotMounted.into());
        }
        self.backend.show_balloon(tip)
    }

    fn handle_event(&mut self, event: TrayEvent) {
        match event {
            TrayEvent::Gesture { clicks, position } => {
                trace!(?clicks, "Tray gesture");
                (self.proxy)(self.id, event);
                if clicks.intersects(self.menu_on_click) {
                    self.show_menu(position);
                }
            }
            TrayEvent::MenuCommand { id } => {
                let outcome = self.menu.dispatch(id);
                trace!(id, ?outcome, "Dispatched menu command");
                (self.proxy)(self.id, event);
            }
            _ => (self.proxy)(self.id, event),
        }
    }

    fn show_menu(&mut self, anchor: PhysicalPosition<i32>) {
        let mut surface = match self.backend.open_surface() {
            Ok(surface) => surface,
            Err(e) => {
                warn!("Failed to create context menu: {e:#}");
                return;
            }
        };

        if self.menu.render(&mut surface) == 0 {
            trace!("No context menu to show");
            return;
        }

        let Some(id) = self.backend.show_and_wait(surface, anchor) else {
            trace!("Context menu dismissed");
            return;
        };

        self.handle_event(TrayEvent::MenuCommand { id });
    }
}
