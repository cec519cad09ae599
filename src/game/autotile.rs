//! Connectivity masks and the mask -> sprite lookup table.
//!
//! A segment's mask has one bit per orthogonal neighbour of the same network
//! (`up=8, right=4, left=2, down=1`). The 16 possible masks collapse onto six
//! canonical shapes; each mask is drawn as the shape's base sprite turned
//! clockwise by some quarter turns, optionally mirrored first.
//!
//! The table is derived at compile time from the six base masks instead of
//! being written out by hand: for every shape, every flip and every rotation
//! we compute the resulting mask and keep the first transform that produces
//! it (no flip before flip, smaller rotation before larger).

use crate::protocol::{CanonicalShape, Cell, Direction, Rotation, SpriteKey};

const UP: u8 = Direction::Up.bit();
const RIGHT: u8 = Direction::Right.bit();
const LEFT: u8 = Direction::Left.bit();
const DOWN: u8 = Direction::Down.bit();

pub const SHAPES: [CanonicalShape; 6] = [
    CanonicalShape::Isolated,
    CanonicalShape::Stub,
    CanonicalShape::Straight,
    CanonicalShape::Turn,
    CanonicalShape::TJunction,
    CanonicalShape::Cross,
];

/// Mask drawn by a shape's untransformed base sprite.
pub const fn base_mask(shape: CanonicalShape) -> u8 {
    match shape {
        CanonicalShape::Isolated => 0,
        CanonicalShape::Stub => UP,
        CanonicalShape::Straight => UP | DOWN,
        CanonicalShape::Turn => UP | RIGHT,
        CanonicalShape::TJunction => UP | RIGHT | LEFT,
        CanonicalShape::Cross => UP | RIGHT | LEFT | DOWN,
    }
}

/// Quarter turn clockwise: up -> right -> down -> left -> up.
pub const fn rotate_cw(mask: u8) -> u8 {
    let mut out = 0;
    if mask & UP != 0 {
        out |= RIGHT;
    }
    if mask & RIGHT != 0 {
        out |= DOWN;
    }
    if mask & DOWN != 0 {
        out |= LEFT;
    }
    if mask & LEFT != 0 {
        out |= UP;
    }
    out
}

/// Horizontal mirror: left <-> right.
pub const fn flip_x(mask: u8) -> u8 {
    let mut out = mask & (UP | DOWN);
    if mask & LEFT != 0 {
        out |= RIGHT;
    }
    if mask & RIGHT != 0 {
        out |= LEFT;
    }
    out
}

/// Mask produced by drawing `mask` mirrored (if asked), then rotated.
pub const fn transform(mask: u8, rotation: Rotation, flip: bool) -> u8 {
    let mut out = if flip { flip_x(mask) } else { mask };
    let mut turns = rotation.quarter_turns();
    while turns > 0 {
        out = rotate_cw(out);
        turns -= 1;
    }
    out
}

const fn build_table() -> [SpriteKey; 16] {
    let mut table = [SpriteKey {
        shape: CanonicalShape::Isolated,
        rotation: Rotation::Deg0,
        flip_x: false,
    }; 16];
    let mut filled = [false; 16];

    let mut s = 0;
    while s < SHAPES.len() {
        let shape = SHAPES[s];
        let mut f = 0;
        while f < 2 {
            let flip = f == 1;
            let mut r = 0;
            while r < Rotation::ALL.len() {
                let rotation = Rotation::ALL[r];
                let mask = transform(base_mask(shape), rotation, flip) as usize;
                if !filled[mask] {
                    filled[mask] = true;
                    table[mask] = SpriteKey {
                        shape,
                        rotation,
                        flip_x: flip,
                    };
                }
                r += 1;
            }
            f += 1;
        }
        s += 1;
    }
    table
}

/// Mask -> (shape, rotation, flip), indexed by the 4-bit mask.
pub const AUTOTILE_TABLE: [SpriteKey; 16] = build_table();

pub fn sprite_for_mask(mask: u8) -> SpriteKey {
    AUTOTILE_TABLE[(mask & 0b1111) as usize]
}

/// Connectivity mask of `cell` given a membership test for its network.
pub fn connectivity_mask(cell: Cell, is_member: impl Fn(Cell) -> bool) -> u8 {
    Direction::ALL
        .iter()
        .filter(|dir| is_member(cell.step(**dir)))
        .fold(0, |mask, dir| mask | dir.bit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn key(shape: CanonicalShape, rotation: Rotation) -> SpriteKey {
        SpriteKey {
            shape,
            rotation,
            flip_x: false,
        }
    }

    #[test]
    fn table_matches_every_mask() {
        use CanonicalShape::*;
        use Rotation::*;

        let expected = [
            (0b0000, key(Isolated, Deg0)),
            (0b0001, key(Stub, Deg180)),
            (0b0010, key(Stub, Deg270)),
            (0b0011, key(Turn, Deg180)),
            (0b0100, key(Stub, Deg90)),
            (0b0101, key(Turn, Deg90)),
            (0b0110, key(Straight, Deg90)),
            (0b0111, key(TJunction, Deg180)),
            (0b1000, key(Stub, Deg0)),
            (0b1001, key(Straight, Deg0)),
            (0b1010, key(Turn, Deg270)),
            (0b1011, key(TJunction, Deg270)),
            (0b1100, key(Turn, Deg0)),
            (0b1101, key(TJunction, Deg90)),
            (0b1110, key(TJunction, Deg0)),
            (0b1111, key(Cross, Deg0)),
        ];
        for (mask, sprite) in expected {
            assert_eq!(sprite_for_mask(mask), sprite, "mask {mask:04b}");
        }
    }

    #[test]
    fn every_entry_reproduces_its_mask() {
        for mask in 0u8..16 {
            let sprite = sprite_for_mask(mask);
            let drawn = transform(base_mask(sprite.shape), sprite.rotation, sprite.flip_x);
            assert_eq!(drawn, mask, "mask {mask:04b} drawn as {sprite:?}");
        }
    }

    #[test]
    fn shape_follows_neighbour_count() {
        for mask in 0u8..16 {
            let shape = sprite_for_mask(mask).shape;
            let n = mask.count_ones();
            let straight = mask == (UP | DOWN) || mask == (LEFT | RIGHT);
            let expected = match n {
                0 => CanonicalShape::Isolated,
                1 => CanonicalShape::Stub,
                2 if straight => CanonicalShape::Straight,
                2 => CanonicalShape::Turn,
                3 => CanonicalShape::TJunction,
                _ => CanonicalShape::Cross,
            };
            assert_eq!(shape, expected, "mask {mask:04b}");
        }
    }

    #[test]
    fn four_rotations_are_identity() {
        for mask in 0u8..16 {
            let mut m = mask;
            for _ in 0..4 {
                m = rotate_cw(m);
            }
            assert_eq!(m, mask);
            assert_eq!(flip_x(flip_x(mask)), mask);
        }
    }

    #[test]
    fn mask_from_membership() {
        let members: HashSet<Cell> = [Cell::new(0, 1), Cell::new(-1, 0)].into_iter().collect();
        let mask = connectivity_mask(Cell::new(0, 0), |c| members.contains(&c));
        assert_eq!(mask, UP | LEFT);
        assert_eq!(sprite_for_mask(mask).shape, CanonicalShape::Turn);
    }
}
