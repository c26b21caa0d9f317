/// State shared by the ingestion and draw paths. Always accessed through
/// the renderer's drawing lock; the draw path works on a copy.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderConstants {
    pub black_level: u16,
    pub color_gain: u16,
    pub number_of_buffer_lines: u16,
    pub number_of_screen_lines: u16,
    /// Slot holding the most recently written line.
    pub top_line_index: u16,
    pub starting_frequency: f32,
    pub ending_frequency: f32,
}

impl RenderConstants {
    /// False until the buffer geometry has been established; frames
    /// arriving before then are dropped.
    pub fn is_sized(&self) -> bool {
        self.number_of_buffer_lines != 0
    }

    /// Rows that can be drawn from history. A screen taller than the
    /// buffer is clamped; the rows below stay background.
    pub fn drawn_lines(&self) -> usize {
        self.number_of_screen_lines.min(self.number_of_buffer_lines) as usize
    }

    /// Slot shown on the bottom (oldest) drawn row.
    pub fn bottom_line_index(&self) -> usize {
        let buffer = self.number_of_buffer_lines as i64;
        if buffer == 0 {
            return 0;
        }
        let drawn = self.drawn_lines() as i64;
        (self.top_line_index as i64 - (drawn - 1)).rem_euclid(buffer) as usize
    }

    /// Slot for drawn row `i`, counting up from the bottom row.
    pub fn slot_for_row(&self, i: usize) -> usize {
        match self.number_of_buffer_lines as usize {
            0 => 0,
            buffer => (self.bottom_line_index() + i) % buffer,
        }
    }

    /// Slot for pixel row `y`, counting down from the top of the surface.
    /// Row 0 is the newest line. `None` below the drawn history.
    pub fn slot_for_screen_row(&self, y: usize) -> Option<usize> {
        let drawn = self.drawn_lines();
        if y >= drawn {
            return None;
        }
        Some(self.slot_for_row(drawn - 1 - y))
    }
}
