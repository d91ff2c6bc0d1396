//! X11 presentation of the overlay
//!
//! The overlay is an override-redirect window (no decorations, not managed by
//! the window manager), raised above everything when shown, centered on the
//! screen and given an empty input shape so pointer events fall through to
//! whatever is underneath.
//!
//! When a compositing manager is running and the screen offers a 32-bit
//! TrueColor visual, the window uses it so the image's alpha channel is
//! honoured. Otherwise the default visual is used and the overlay is simply
//! opaque. The choice is re-evaluated whenever the compositing manager comes
//! or goes, or the root window is reconfigured.

use log::{debug, info, trace, warn};
use std::borrow::Cow;
use std::os::fd::{AsFd, BorrowedFd};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::image::{BitsPerPixel, Image, ImageOrder, ScanlinePad};
use x11rb::protocol::shape::{self, ConnectionExt as _};
use x11rb::protocol::xfixes::{self, ConnectionExt as _, SelectionEventMask};
use x11rb::protocol::xproto::{
    AtomEnum, ChangeWindowAttributesAux, ClipOrdering, ColormapAlloc, ConfigureWindowAux,
    ConnectionExt as _, CreateGCAux, CreateWindowAux, Depth, EventMask, Gcontext, PropMode,
    Screen, StackMode, VisualClass, Visualid, Window, WindowClass,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::NONE;

use super::OverlaySurface;
use crate::error::Result;
use crate::presenter::OverlayWindow;

const WINDOW_NAME: &[u8] = b"anniebelle";
const WINDOW_CLASS: &[u8] = b"anniebelle\0Anniebelle\0";

/// Visual and depth the window is created with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualChoice {
    pub visual: Visualid,
    pub depth: u8,
    /// Whether the visual carries an alpha channel
    pub argb: bool,
}

/// Find a 32-bit TrueColor visual among the screen's allowed depths
pub fn find_argb_visual(depths: &[Depth]) -> Option<Visualid> {
    depths
        .iter()
        .filter(|depth| depth.depth == 32)
        .flat_map(|depth| depth.visuals.iter())
        .find(|visual| visual.class == VisualClass::TRUE_COLOR)
        .map(|visual| visual.visual_id)
}

/// Pick the transparency-capable visual when it can actually be composited,
/// the screen default otherwise
pub fn choose_visual(screen: &Screen, composited: bool) -> VisualChoice {
    match find_argb_visual(&screen.allowed_depths) {
        Some(visual) if composited => VisualChoice {
            visual,
            depth: 32,
            argb: true,
        },
        _ => VisualChoice {
            visual: screen.root_visual,
            depth: screen.root_depth,
            argb: false,
        },
    }
}

/// Top-left corner placing a `size` window in the middle of `screen`
pub fn centered_origin(screen: (u16, u16), size: (u16, u16)) -> (i16, i16) {
    let x = (i32::from(screen.0) - i32::from(size.0)) / 2;
    let y = (i32::from(screen.1) - i32::from(size.1)) / 2;
    (clamp_i16(x), clamp_i16(y))
}

fn clamp_i16(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

/// X resources that depend on the chosen visual
struct WindowResources {
    window: Window,
    gc: Gcontext,
    /// Colormap we created for a non-default visual
    colormap: Option<u32>,
    choice: VisualChoice,
}

/// The overlay window and the connection it lives on
pub struct X11Overlay {
    conn: RustConnection,
    screen_num: usize,
    surface: OverlaySurface,
    pixels: Vec<u8>,
    screen_size: (u16, u16),
    cm_selection: u32,
    resources: WindowResources,
    mapped: bool,
}

impl X11Overlay {
    /// Connect to `display` and create the (unmapped) overlay window
    pub fn new(display: Option<&str>, surface: OverlaySurface) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(display)?;
        let screen = conn.setup().roots[screen_num].clone();
        let screen_size = (screen.width_in_pixels, screen.height_in_pixels);

        let cm_name = format!("_NET_WM_CM_S{}", screen_num);
        let cm_selection = conn.intern_atom(false, cm_name.as_bytes())?.reply()?.atom;

        watch_compositor(&conn, screen.root, cm_selection)?;
        conn.change_window_attributes(
            screen.root,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::STRUCTURE_NOTIFY),
        )?;

        let composited = conn.get_selection_owner(cm_selection)?.reply()?.owner != NONE;
        let choice = choose_visual(&screen, composited);
        let resources = create_window(&conn, &screen, &surface, screen_size, choice)?;
        conn.flush()?;

        info!(
            "🪟 Overlay window 0x{:x} ready ({}x{}, {})",
            resources.window,
            surface.width(),
            surface.height(),
            if choice.argb { "translucent" } else { "opaque" }
        );

        let pixels = surface.to_bgra();
        Ok(Self {
            conn,
            screen_num,
            surface,
            pixels,
            screen_size,
            cm_selection,
            resources,
            mapped: false,
        })
    }

    /// Blit the whole image over the window, replacing what was there
    pub fn redraw(&self) -> Result<()> {
        let (width, height) = self.surface.size();
        let image = Image::new(
            width,
            height,
            ScanlinePad::Pad32,
            self.resources.choice.depth,
            BitsPerPixel::B32,
            ImageOrder::LsbFirst,
            Cow::Borrowed(self.pixels.as_slice()),
        )?;
        let image = image.native(self.conn.setup())?;
        image.put(&self.conn, self.resources.window, self.resources.gc, 0, 0)?;
        self.conn.flush()?;
        trace!("redrew overlay");
        Ok(())
    }

    /// Re-evaluate the visual and recreate the window if it changed
    pub fn reapply_visual(&mut self) -> Result<()> {
        let screen = self.conn.setup().roots[self.screen_num].clone();
        let composited = self.conn.get_selection_owner(self.cm_selection)?.reply()?.owner != NONE;
        let choice = choose_visual(&screen, composited);
        if choice == self.resources.choice {
            debug!("visual unchanged (argb: {})", choice.argb);
            return Ok(());
        }

        info!(
            "🎨 Compositing changed, switching overlay to {} visual",
            if choice.argb { "translucent" } else { "opaque" }
        );
        let fresh = create_window(&self.conn, &screen, &self.surface, self.screen_size, choice)?;
        let stale = std::mem::replace(&mut self.resources, fresh);
        destroy_window(&self.conn, &stale)?;

        if self.mapped {
            self.map()?;
        }
        self.conn.flush()?;
        Ok(())
    }

    /// Move the window back to the middle of the screen
    pub fn recenter(&mut self, screen_size: (u16, u16)) -> Result<()> {
        self.screen_size = screen_size;
        let (x, y) = centered_origin(screen_size, self.surface.size());
        self.conn.configure_window(
            self.resources.window,
            &ConfigureWindowAux::new().x(i32::from(x)).y(i32::from(y)),
        )?;
        self.conn.flush()?;
        debug!("overlay recentered at {},{}", x, y);
        Ok(())
    }

    /// Handle everything queued on the overlay connection without blocking
    pub fn process_pending(&mut self) -> Result<()> {
        while let Some(event) = self.conn.poll_for_event()? {
            self.handle_event(event);
        }
        Ok(())
    }

    /// Redraw, recenter and visual failures are logged; only a dead
    /// connection (surfacing from `poll_for_event`) stops the loop.
    fn handle_event(&mut self, event: Event) {
        let root = self.conn.setup().roots[self.screen_num].root;
        match event {
            Event::Expose(e) if e.window == self.resources.window && e.count == 0 => {
                if let Err(e) = self.redraw() {
                    warn!("Failed to redraw overlay: {}", e);
                }
            }
            Event::ConfigureNotify(e) if e.window == root => {
                let size = (e.width, e.height);
                if size != self.screen_size {
                    info!("🖥️ Screen resized to {}x{}", e.width, e.height);
                    if let Err(e) = self.recenter(size) {
                        warn!("Failed to recenter overlay: {}", e);
                    }
                }
                if let Err(e) = self.reapply_visual() {
                    warn!("Failed to re-apply overlay visual: {}", e);
                }
            }
            Event::XfixesSelectionNotify(e) if e.selection == self.cm_selection => {
                debug!("compositing manager selection changed owner to 0x{:x}", e.owner);
                if let Err(e) = self.reapply_visual() {
                    warn!("Failed to re-apply overlay visual: {}", e);
                }
            }
            Event::Error(e) => warn!("X error on overlay connection: {:?}", e),
            other => trace!("overlay ignoring {:?}", other),
        }
    }

    fn map(&self) -> Result<()> {
        let window = self.resources.window;
        self.conn.map_window(window)?;
        self.conn
            .configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))?;
        Ok(())
    }

    fn try_show(&mut self) -> Result<()> {
        self.map()?;
        self.conn.flush()?;
        self.mapped = true;
        Ok(())
    }

    fn try_hide(&mut self) -> Result<()> {
        self.conn.unmap_window(self.resources.window)?;
        self.conn.flush()?;
        self.mapped = false;
        Ok(())
    }
}

impl OverlayWindow for X11Overlay {
    fn show(&mut self) {
        if let Err(e) = self.try_show() {
            warn!("Failed to show overlay: {}", e);
        }
    }

    fn hide(&mut self) {
        if let Err(e) = self.try_hide() {
            warn!("Failed to hide overlay: {}", e);
        }
    }
}

impl AsFd for X11Overlay {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.conn.stream().as_fd()
    }
}

/// Ask for XFixes notifications when the compositing manager selection
/// changes hands. Without XFixes the visual is only re-evaluated on root
/// reconfiguration.
fn watch_compositor(conn: &RustConnection, root: Window, selection: u32) -> Result<()> {
    if conn
        .extension_information(xfixes::X11_EXTENSION_NAME)?
        .is_none()
    {
        warn!("XFixes unavailable, compositing changes will go unnoticed");
        return Ok(());
    }
    conn.xfixes_query_version(5, 0)?.reply()?;
    conn.xfixes_select_selection_input(
        root,
        selection,
        SelectionEventMask::SET_SELECTION_OWNER
            | SelectionEventMask::SELECTION_WINDOW_DESTROY
            | SelectionEventMask::SELECTION_CLIENT_CLOSE,
    )?;
    Ok(())
}

fn create_window(
    conn: &RustConnection,
    screen: &Screen,
    surface: &OverlaySurface,
    screen_size: (u16, u16),
    choice: VisualChoice,
) -> Result<WindowResources> {
    let (width, height) = surface.size();
    let (x, y) = centered_origin(screen_size, (width, height));

    let colormap = if choice.visual == screen.root_visual {
        None
    } else {
        let id = conn.generate_id()?;
        conn.create_colormap(ColormapAlloc::NONE, id, screen.root, choice.visual)?;
        Some(id)
    };

    let window = conn.generate_id()?;
    conn.create_window(
        choice.depth,
        window,
        screen.root,
        x,
        y,
        width,
        height,
        0,
        WindowClass::INPUT_OUTPUT,
        choice.visual,
        &CreateWindowAux::new()
            .background_pixel(0)
            .border_pixel(0)
            .override_redirect(1)
            .colormap(colormap.unwrap_or(screen.default_colormap))
            .event_mask(EventMask::EXPOSURE),
    )?;

    conn.change_property8(
        PropMode::REPLACE,
        window,
        AtomEnum::WM_NAME,
        AtomEnum::STRING,
        WINDOW_NAME,
    )?;
    conn.change_property8(
        PropMode::REPLACE,
        window,
        AtomEnum::WM_CLASS,
        AtomEnum::STRING,
        WINDOW_CLASS,
    )?;

    make_click_through(conn, window)?;

    let gc = conn.generate_id()?;
    conn.create_gc(gc, window, &CreateGCAux::new().graphics_exposures(0))?;

    Ok(WindowResources {
        window,
        gc,
        colormap,
        choice,
    })
}

/// Give the window an empty input region
fn make_click_through(conn: &RustConnection, window: Window) -> Result<()> {
    if conn
        .extension_information(shape::X11_EXTENSION_NAME)?
        .is_none()
    {
        warn!("SHAPE unavailable, the overlay will swallow clicks");
        return Ok(());
    }
    conn.shape_rectangles(
        shape::SO::SET,
        shape::SK::INPUT,
        ClipOrdering::UNSORTED,
        window,
        0,
        0,
        &[],
    )?;
    Ok(())
}

fn destroy_window(conn: &RustConnection, resources: &WindowResources) -> Result<()> {
    conn.free_gc(resources.gc)?;
    conn.destroy_window(resources.window)?;
    if let Some(colormap) = resources.colormap {
        conn.free_colormap(colormap)?;
    }
    Ok(())
}
