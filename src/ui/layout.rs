use crate::playback::SkipAmount;

pub const GRID_ROWS: i32 = 50;
pub const GRID_COLUMNS: i32 = 212;
/// Pixels left free below the window inside the screen's work area.
pub const VERTICAL_MARGIN: i32 = 30;

/// A rectangle on the layout grid. `width` counts columns and `height` rows.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GridCell {
    pub row: i32,
    pub column: i32,
    pub width: i32,
    pub height: i32,
}

impl GridCell {
    pub const fn new(row: i32, column: i32, width: i32, height: i32) -> Self {
        Self {
            row,
            column,
            width,
            height,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// Pixel size of one grid cell for a given window size.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GridGeometry {
    pub column_width: i32,
    pub row_height: i32,
}

impl GridGeometry {
    pub fn new(window_width: i32, window_height: i32) -> Self {
        Self {
            column_width: window_width / GRID_COLUMNS,
            row_height: window_height / GRID_ROWS,
        }
    }

    pub fn rect(&self, cell: GridCell) -> PixelRect {
        PixelRect {
            x: cell.column * self.column_width,
            y: cell.row * self.row_height,
            w: cell.width * self.column_width,
            h: cell.height * self.row_height,
        }
    }
}

/// Window size for a screen work area of `width` x `height`.
pub fn window_size(work_area_width: i32, work_area_height: i32) -> (i32, i32) {
    (
        work_area_width,
        (work_area_height - VERTICAL_MARGIN).max(GRID_ROWS),
    )
}

/// Every action a transport button can trigger.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    Close,
    PlayPause,
    DoubleSpeed,
    HalfSpeed,
    StepFrame { forward: bool },
    Skip { amount: SkipAmount, forward: bool },
}

#[derive(Debug, Copy, Clone)]
pub struct ButtonSpec {
    pub label: &'static str,
    pub tooltip: &'static str,
    pub cell: GridCell,
    pub command: TransportCommand,
}

const fn button(
    label: &'static str,
    tooltip: &'static str,
    cell: GridCell,
    command: TransportCommand,
) -> ButtonSpec {
    ButtonSpec {
        label,
        tooltip,
        cell,
        command,
    }
}

pub const VIDEO_CELL: GridCell = GridCell::new(0, 0, 210, 46);
pub const SPEED_LABEL_CELL: GridCell = GridCell::new(11, 183, 15, 2);

pub const TRANSPORT_BUTTONS: &[ButtonSpec] = &[
    button(
        "CLOSE",
        "Close the video",
        GridCell::new(0, 185, 20, 2),
        TransportCommand::Close,
    ),
    button(
        "PLAY/PAUSE",
        "Play or pause the video",
        GridCell::new(8, 178, 20, 2),
        TransportCommand::PlayPause,
    ),
    button(
        "SPEED x 2",
        "Double the video speed",
        GridCell::new(14, 190, 20, 2),
        TransportCommand::DoubleSpeed,
    ),
    button(
        "SPEED / 2",
        "Halve the video speed",
        GridCell::new(14, 165, 20, 2),
        TransportCommand::HalfSpeed,
    ),
    button(
        "1 FRAME >",
        "Skip forward 1 frame",
        GridCell::new(17, 190, 20, 2),
        TransportCommand::StepFrame { forward: true },
    ),
    button(
        "< 1 FRAME",
        "Skip backward 1 frame",
        GridCell::new(17, 165, 20, 2),
        TransportCommand::StepFrame { forward: false },
    ),
    button(
        "10 SECONDS >>",
        "Skip forward 10 seconds",
        GridCell::new(20, 190, 20, 2),
        TransportCommand::Skip {
            amount: SkipAmount::TenSeconds,
            forward: true,
        },
    ),
    button(
        "<< 10 SECONDS",
        "Skip backward 10 seconds",
        GridCell::new(20, 165, 20, 2),
        TransportCommand::Skip {
            amount: SkipAmount::TenSeconds,
            forward: false,
        },
    ),
    button(
        "5 MINUTES >>>",
        "Skip forward 5 minutes",
        GridCell::new(23, 190, 20, 2),
        TransportCommand::Skip {
            amount: SkipAmount::FiveMinutes,
            forward: true,
        },
    ),
    button(
        "<<< 5 MINUTES",
        "Skip backward 5 minutes",
        GridCell::new(23, 165, 20, 2),
        TransportCommand::Skip {
            amount: SkipAmount::FiveMinutes,
            forward: false,
        },
    ),
];
