//! Snapshot Inputs
//!
//! The simulation state the recorder consumes each tick: character
//! positions and the raw player input struct.

/// Position snapshot of one character.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CharacterCore {
    /// X position in world units
    pub x: i32,
    /// Y position in world units
    pub y: i32,
}

impl CharacterCore {
    /// Create from a position.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Raw player input, as sent by the client every tick.
///
/// Field order is the wire order of INPUT_NEW / INPUT_DIFF records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct PlayerInput {
    /// Walking direction: -1, 0 or 1
    pub direction: i32,
    /// Cursor X relative to the character
    pub target_x: i32,
    /// Cursor Y relative to the character
    pub target_y: i32,
    /// Jump held
    pub jump: i32,
    /// Fire counter (incremented on press and release)
    pub fire: i32,
    /// Hook held
    pub hook: i32,
    /// Client-side flags (chatting, in menu, ...)
    pub player_flags: i32,
    /// Weapon selected by number key
    pub wanted_weapon: i32,
    /// Next-weapon counter
    pub next_weapon: i32,
    /// Previous-weapon counter
    pub prev_weapon: i32,
}

impl PlayerInput {
    /// Number of integer fields.
    pub const FIELDS: usize = 10;

    /// Fields in wire order.
    pub const fn to_array(&self) -> [i32; Self::FIELDS] {
        [
            self.direction,
            self.target_x,
            self.target_y,
            self.jump,
            self.fire,
            self.hook,
            self.player_flags,
            self.wanted_weapon,
            self.next_weapon,
            self.prev_weapon,
        ]
    }

    /// Build from fields in wire order.
    pub const fn from_array(fields: [i32; Self::FIELDS]) -> Self {
        Self {
            direction: fields[0],
            target_x: fields[1],
            target_y: fields[2],
            jump: fields[3],
            fire: fields[4],
            hook: fields[5],
            player_flags: fields[6],
            wanted_weapon: fields[7],
            next_weapon: fields[8],
            prev_weapon: fields[9],
        }
    }

    /// Field-wise `self - prev`, wrapping like the C snapshot delta.
    pub fn diff_from(&self, prev: &PlayerInput) -> [i32; Self::FIELDS] {
        let new = self.to_array();
        let old = prev.to_array();
        std::array::from_fn(|i| new[i].wrapping_sub(old[i]))
    }

    /// Reconstruct the input a diff was taken against `self` for.
    pub fn apply_diff(&self, diff: &[i32; Self::FIELDS]) -> PlayerInput {
        let old = self.to_array();
        Self::from_array(std::array::from_fn(|i| old[i].wrapping_add(diff[i])))
    }
}
