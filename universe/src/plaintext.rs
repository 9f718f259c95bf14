//! `.`/`o` grid helpers for tests and dumps
//!
//! This has very little error handling; it is for patterns written next to
//! the code, not for untrusted input.

use crate::pos::Pos;
use crate::universe::{Error, Universe};

impl Universe {
    /// Sets the pattern's live cells, row by row, with the first character
    /// of the first row at `min`.
    ///
    /// Rows are whitespace-separated, so indented string literals work
    /// as-is. Dead cells (`.`) leave the universe untouched.
    ///
    /// # Errors
    /// [`Error::CoordinateOutOfRange`] as for [`Universe::set`].
    pub fn insert_plaintext(&mut self, min: Pos, pattern: &str) -> Result<(), Error> {
        for (y, row) in pattern.split_ascii_whitespace().enumerate() {
            for (x, byte) in row.bytes().enumerate() {
                match byte {
                    b'.' => {}
                    b'o' => {
                        let pos = min
                            + Pos {
                                x: x as i64,
                                y: y as i64,
                            };
                        self.set(pos, true)?;
                    }
                    _ => panic!("invalid plaintext byte {byte:#04x}"),
                }
            }
        }
        Ok(())
    }

    /// Renders the `width` x `height` window whose north-west corner is
    /// `min`, one row per line.
    pub fn plaintext(&self, min: Pos, width: u32, height: u32) -> String {
        let mut out = String::with_capacity((width as usize + 1) * height as usize);
        for y in 0..i64::from(height) {
            for x in 0..i64::from(width) {
                let pos = min + Pos { x, y };
                out.push(if self.get(pos) { 'o' } else { '.' });
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod test {
    use unindent::unindent;

    use crate::pos::Pos;
    use crate::universe::Universe;

    #[test]
    fn round_trip() {
        let pattern = unindent(
            "
            .o..
            ..o.
            ooo.
            ....
            ",
        );
        let mut universe = Universe::new();
        universe
            .insert_plaintext(Pos { x: -2, y: -2 }, &pattern)
            .unwrap();
        assert_eq!(universe.population(), 5);
        assert_eq!(universe.plaintext(Pos { x: -2, y: -2 }, 4, 4), pattern);
    }

    #[test]
    fn render_follows_the_window() {
        let mut universe = Universe::new();
        universe.set(Pos { x: 0, y: 0 }, true).unwrap();
        assert_eq!(universe.plaintext(Pos { x: 0, y: 0 }, 2, 2), "o.\n..\n");
        assert_eq!(universe.plaintext(Pos { x: -1, y: -1 }, 2, 2), "..\n.o\n");
    }

    #[test]
    #[should_panic(expected = "invalid plaintext byte")]
    fn rejects_unknown_bytes() {
        let mut universe = Universe::new();
        universe
            .insert_plaintext(Pos { x: 0, y: 0 }, "ox")
            .unwrap();
    }
}
