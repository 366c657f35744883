use engine::PixelPos;

use super::npc::NpcIdentity;

/// Tile under a pixel position. `None` for a degenerate tile size.
pub(crate) fn tile_of(pos: PixelPos, tile_size: (u32, u32)) -> Option<(i32, i32)> {
    if tile_size.0 == 0 || tile_size.1 == 0 {
        return None;
    }
    Some((
        pos.x.div_euclid(tile_size.0 as i32),
        pos.y.div_euclid(tile_size.1 as i32),
    ))
}

/// First NPC in `roster` order whose tile equals the tile under the
/// player's top-left corner.
pub(crate) fn detect_encounter(
    player_pos: PixelPos,
    tile_size: (u32, u32),
    roster: &[NpcIdentity],
) -> Option<NpcIdentity> {
    let player_tile = tile_of(player_pos, tile_size)?;
    roster
        .iter()
        .copied()
        .find(|npc| npc.tile() == player_tile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::gameplay::npc::ROSTER;

    fn at_tile(x: i32, y: i32) -> PixelPos {
        PixelPos { x: x * 32, y: y * 32 }
    }

    #[test]
    fn exact_tile_match_starts_encounter() {
        assert_eq!(
            detect_encounter(at_tile(42, 4), (32, 32), &ROSTER),
            Some(NpcIdentity::OldManCedric)
        );
        assert_eq!(
            detect_encounter(at_tile(49, 35), (32, 32), &ROSTER),
            Some(NpcIdentity::TorchbearerKorr)
        );
    }

    #[test]
    fn any_pixel_inside_the_tile_counts() {
        let inside = PixelPos {
            x: 53 * 32 + 31,
            y: 19 * 32 + 31,
        };
        assert_eq!(
            detect_encounter(inside, (32, 32), &ROSTER),
            Some(NpcIdentity::BugsyTheApprentice)
        );
    }

    #[test]
    fn neighbouring_tiles_do_not_trigger() {
        assert_eq!(detect_encounter(at_tile(41, 4), (32, 32), &ROSTER), None);
        assert_eq!(detect_encounter(at_tile(42, 5), (32, 32), &ROSTER), None);
        assert_eq!(detect_encounter(at_tile(58, 4), (32, 32), &ROSTER), None);
    }

    #[test]
    fn only_npcs_in_the_given_roster_are_considered() {
        let roster = [NpcIdentity::BugsyTheApprentice];
        assert_eq!(detect_encounter(at_tile(42, 4), (32, 32), &roster), None);
        assert_eq!(
            detect_encounter(at_tile(53, 19), (32, 32), &roster),
            Some(NpcIdentity::BugsyTheApprentice)
        );
    }

    #[test]
    fn negative_pixels_floor_to_negative_tiles() {
        assert_eq!(tile_of(PixelPos { x: -1, y: 31 }, (32, 32)), Some((-1, 0)));
        assert_eq!(tile_of(PixelPos { x: 0, y: 0 }, (0, 0)), None);
    }

    #[test]
    fn empty_roster_or_zero_tiles_never_match() {
        assert_eq!(detect_encounter(at_tile(42, 4), (32, 32), &[]), None);
        assert_eq!(detect_encounter(at_tile(42, 4), (0, 32), &ROSTER), None);
    }
}
