use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use image::ImageReader;
use roxmltree::{Document, Node};

use super::error::{ContentErrorCode, ContentLoadError};

const COLLISION_PROPERTY: &str = "collision";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilesetImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Tileset {
    pub first_gid: u32,
    pub columns: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub image: TilesetImage,
    pub source_path: PathBuf,
}

impl Tileset {
    /// Top-left pixel of `gid` inside the tileset image, or `None` when the
    /// computed cell falls outside the image.
    pub fn source_origin_px(&self, gid: u32) -> Option<(u32, u32)> {
        let local = gid.checked_sub(self.first_gid)?;
        if self.columns == 0 {
            return None;
        }
        let col = local % self.columns;
        let row = local / self.columns;
        let x = col.checked_mul(self.tile_width)?;
        let y = row.checked_mul(self.tile_height)?;
        let fits_x = x.checked_add(self.tile_width)? <= self.image.width;
        let fits_y = y.checked_add(self.tile_height)? <= self.image.height;
        (fits_x && fits_y).then_some((x, y))
    }
}

/// Global tile ids flagged collidable. Built once at load time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollidableSet(HashSet<u32>);

impl CollidableSet {
    pub fn contains(&self, gid: u32) -> bool {
        gid != 0 && self.0.contains(&gid)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<u32> for CollidableSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TilesetRegistry {
    tilesets: Vec<Tileset>,
    collidable: CollidableSet,
}

impl TilesetRegistry {
    pub fn new(mut tilesets: Vec<Tileset>, collidable: CollidableSet) -> Self {
        tilesets.sort_by_key(|tileset| tileset.first_gid);
        Self {
            tilesets,
            collidable,
        }
    }

    /// Tileset with the greatest `first_gid <= gid`, scanning from the top.
    pub fn resolve(&self, gid: u32) -> Option<&Tileset> {
        self.tilesets
            .iter()
            .rev()
            .find(|tileset| tileset.first_gid <= gid)
    }

    pub fn is_collidable_gid(&self, gid: u32) -> bool {
        self.collidable.contains(gid)
    }

    pub fn tilesets(&self) -> &[Tileset] {
        &self.tilesets
    }

    pub fn collidable(&self) -> &CollidableSet {
        &self.collidable
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TilesetDescriptor {
    pub columns: u32,
    pub tile_width: Option<u32>,
    pub tile_height: Option<u32>,
    pub image_source: String,
    pub collidable_local_ids: Vec<u32>,
}

pub(crate) struct LoadedTileset {
    pub tileset: Tileset,
    pub collidable_gids: Vec<u32>,
}

pub(crate) fn load_tileset(
    path: &Path,
    first_gid: u32,
    fallback_tile_size: (u32, u32),
) -> Result<LoadedTileset, ContentLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| {
        ContentLoadError::new(
            ContentErrorCode::ReadFile,
            format!("failed to read tileset descriptor: {source}"),
            path,
        )
    })?;
    let descriptor = parse_tileset_descriptor(path, &raw)?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let image_path = base_dir.join(&descriptor.image_source);
    let image = load_tileset_image(&image_path)?;

    let collidable_gids = descriptor
        .collidable_local_ids
        .iter()
        .filter_map(|local| first_gid.checked_add(*local))
        .collect();

    Ok(LoadedTileset {
        tileset: Tileset {
            first_gid,
            columns: descriptor.columns,
            tile_width: descriptor.tile_width.unwrap_or(fallback_tile_size.0),
            tile_height: descriptor.tile_height.unwrap_or(fallback_tile_size.1),
            image,
            source_path: path.to_path_buf(),
        },
        collidable_gids,
    })
}

pub(crate) fn parse_tileset_descriptor(
    file_path: &Path,
    raw: &str,
) -> Result<TilesetDescriptor, ContentLoadError> {
    let doc = Document::parse(raw).map_err(|error| {
        ContentLoadError::new(
            ContentErrorCode::XmlMalformed,
            format!("malformed XML: {error}"),
            file_path,
        )
        .at(error.pos().row as usize, error.pos().col as usize)
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "tileset" {
        return Err(error_at_node(
            ContentErrorCode::InvalidRoot,
            "root element must be <tileset>".to_string(),
            file_path,
            &doc,
            root,
        ));
    }

    let columns = required_positive_u32(root, "columns", file_path, &doc)?;
    let tile_width = optional_positive_u32(root, "tilewidth", file_path, &doc)?;
    let tile_height = optional_positive_u32(root, "tileheight", file_path, &doc)?;

    let image_node = root
        .children()
        .find(|node| node.is_element() && node.tag_name().name() == "image")
        .ok_or_else(|| {
            error_at_node(
                ContentErrorCode::MissingField,
                "missing <image> element".to_string(),
                file_path,
                &doc,
                root,
            )
        })?;
    let image_source = image_node
        .attribute("source")
        .map(str::trim)
        .filter(|source| !source.is_empty())
        .ok_or_else(|| {
            error_at_node(
                ContentErrorCode::MissingField,
                "<image> is missing a source attribute".to_string(),
                file_path,
                &doc,
                image_node,
            )
        })?
        .to_string();

    let mut collidable_local_ids = Vec::new();
    for tile in root
        .children()
        .filter(|node| node.is_element() && node.tag_name().name() == "tile")
    {
        let id = required_u32(tile, "id", file_path, &doc)?;
        if tile_is_collidable(tile) {
            collidable_local_ids.push(id);
        }
    }

    Ok(TilesetDescriptor {
        columns,
        tile_width,
        tile_height,
        image_source,
        collidable_local_ids,
    })
}

fn tile_is_collidable(tile: Node<'_, '_>) -> bool {
    tile.children()
        .filter(|node| node.is_element() && node.tag_name().name() == "properties")
        .flat_map(|properties| properties.children())
        .filter(|node| node.is_element() && node.tag_name().name() == "property")
        .any(|property| {
            let name_matches = property
                .attribute("name")
                .is_some_and(|name| name.eq_ignore_ascii_case(COLLISION_PROPERTY));
            name_matches && property.attribute("value") == Some("true")
        })
}

fn load_tileset_image(path: &Path) -> Result<TilesetImage, ContentLoadError> {
    let reader = ImageReader::open(path).map_err(|error| {
        ContentLoadError::new(
            ContentErrorCode::ImageLoad,
            format!("failed to open tileset image: {error}"),
            path,
        )
    })?;
    let decoded = reader.decode().map_err(|error| {
        ContentLoadError::new(
            ContentErrorCode::ImageLoad,
            format!("failed to decode tileset image: {error}"),
            path,
        )
    })?;
    let image = decoded.to_rgba8();
    Ok(TilesetImage {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

fn required_u32(
    node: Node<'_, '_>,
    attribute: &str,
    file_path: &Path,
    doc: &Document<'_>,
) -> Result<u32, ContentLoadError> {
    let raw = node.attribute(attribute).ok_or_else(|| {
        error_at_node(
            ContentErrorCode::MissingField,
            format!("<{}> is missing attribute '{attribute}'", node.tag_name().name()),
            file_path,
            doc,
            node,
        )
    })?;
    parse_u32_attribute(node, attribute, raw, file_path, doc)
}

fn required_positive_u32(
    node: Node<'_, '_>,
    attribute: &str,
    file_path: &Path,
    doc: &Document<'_>,
) -> Result<u32, ContentLoadError> {
    let value = required_u32(node, attribute, file_path, doc)?;
    ensure_positive(node, attribute, value, file_path, doc)
}

fn optional_positive_u32(
    node: Node<'_, '_>,
    attribute: &str,
    file_path: &Path,
    doc: &Document<'_>,
) -> Result<Option<u32>, ContentLoadError> {
    match node.attribute(attribute) {
        Some(raw) => {
            let value = parse_u32_attribute(node, attribute, raw, file_path, doc)?;
            ensure_positive(node, attribute, value, file_path, doc).map(Some)
        }
        None => Ok(None),
    }
}

fn parse_u32_attribute(
    node: Node<'_, '_>,
    attribute: &str,
    raw: &str,
    file_path: &Path,
    doc: &Document<'_>,
) -> Result<u32, ContentLoadError> {
    raw.trim().parse::<u32>().map_err(|_| {
        error_at_node(
            ContentErrorCode::InvalidValue,
            format!("attribute '{attribute}' must be a non-negative integer, got '{raw}'"),
            file_path,
            doc,
            node,
        )
    })
}

fn ensure_positive(
    node: Node<'_, '_>,
    attribute: &str,
    value: u32,
    file_path: &Path,
    doc: &Document<'_>,
) -> Result<u32, ContentLoadError> {
    if value == 0 {
        return Err(error_at_node(
            ContentErrorCode::InvalidValue,
            format!("attribute '{attribute}' must be greater than zero"),
            file_path,
            doc,
            node,
        ));
    }
    Ok(value)
}

fn error_at_node(
    code: ContentErrorCode,
    message: String,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> ContentLoadError {
    let pos = doc.text_pos_at(node.range().start);
    ContentLoadError::new(code, message, file_path).at(pos.row as usize, pos.col as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn blank_image(width: u32, height: u32) -> TilesetImage {
        TilesetImage {
            width,
            height,
            rgba: vec![0; width as usize * height as usize * 4],
        }
    }

    fn tileset(first_gid: u32) -> Tileset {
        Tileset {
            first_gid,
            columns: 4,
            tile_width: 16,
            tile_height: 16,
            image: blank_image(64, 32),
            source_path: PathBuf::from(format!("set_{first_gid}.tsx")),
        }
    }

    fn parse(raw: &str) -> Result<TilesetDescriptor, ContentLoadError> {
        parse_tileset_descriptor(Path::new("fixture.tsx"), raw)
    }

    #[test]
    fn resolve_picks_greatest_first_gid_not_above_query() {
        let registry = TilesetRegistry::new(
            vec![tileset(1), tileset(9), tileset(5)],
            CollidableSet::default(),
        );

        assert!(registry.resolve(0).is_none());
        assert_eq!(registry.resolve(1).map(|t| t.first_gid), Some(1));
        assert_eq!(registry.resolve(4).map(|t| t.first_gid), Some(1));
        assert_eq!(registry.resolve(5).map(|t| t.first_gid), Some(5));
        assert_eq!(registry.resolve(8).map(|t| t.first_gid), Some(5));
        assert_eq!(registry.resolve(9).map(|t| t.first_gid), Some(9));
        assert_eq!(registry.resolve(4000).map(|t| t.first_gid), Some(9));
    }

    #[test]
    fn resolve_returns_none_below_every_range() {
        let registry = TilesetRegistry::new(vec![tileset(10)], CollidableSet::default());
        assert!(registry.resolve(9).is_none());
        assert!(TilesetRegistry::default().resolve(1).is_none());
    }

    #[test]
    fn registry_stores_tilesets_in_ascending_first_gid_order() {
        let registry = TilesetRegistry::new(
            vec![tileset(33), tileset(1), tileset(17)],
            CollidableSet::default(),
        );
        let order: Vec<u32> = registry.tilesets().iter().map(|t| t.first_gid).collect();
        assert_eq!(order, vec![1, 17, 33]);
    }

    #[test]
    fn collidable_set_never_contains_empty_gid() {
        let set: CollidableSet = [0, 3].into_iter().collect();
        assert!(!set.contains(0));
        assert!(set.contains(3));
    }

    #[test]
    fn source_origin_uses_columns_for_row_major_layout() {
        let set = tileset(5);
        assert_eq!(set.source_origin_px(5), Some((0, 0)));
        assert_eq!(set.source_origin_px(8), Some((48, 0)));
        assert_eq!(set.source_origin_px(9), Some((0, 16)));
        assert_eq!(set.source_origin_px(4), None);
    }

    #[test]
    fn source_origin_outside_image_is_none() {
        let set = tileset(1);
        // 64x32 image holds 8 tiles; gid 9 would start at row 2.
        assert_eq!(set.source_origin_px(9), None);
    }

    #[test]
    fn descriptor_collects_collision_tiles_case_insensitively() {
        let descriptor = parse(
            r#"<tileset name="terrain" tilewidth="32" tileheight="32" columns="4">
                <image source="terrain.png" width="128" height="32"/>
                <tile id="2"><properties><property name="Collision" type="bool" value="true"/></properties></tile>
                <tile id="3"><properties><property name="COLLISION" value="true"/></properties></tile>
                <tile id="1"><properties><property name="collision" value="false"/></properties></tile>
                <tile id="0"><properties><property name="solid" value="true"/></properties></tile>
            </tileset>"#,
        )
        .expect("descriptor");

        assert_eq!(descriptor.columns, 4);
        assert_eq!(descriptor.tile_width, Some(32));
        assert_eq!(descriptor.image_source, "terrain.png");
        assert_eq!(descriptor.collidable_local_ids, vec![2, 3]);
    }

    #[test]
    fn descriptor_collision_value_must_be_lowercase_true() {
        let descriptor = parse(
            r#"<tileset columns="1"><image source="a.png"/>
                <tile id="0"><properties><property name="collision" value="True"/></properties></tile>
            </tileset>"#,
        )
        .expect("descriptor");
        assert!(descriptor.collidable_local_ids.is_empty());
    }

    #[test]
    fn descriptor_rejects_malformed_xml_with_location() {
        let err = parse("<tileset columns=\"4\"><image source=\"a.png\"></tileset>").expect_err("err");
        assert_eq!(err.code, ContentErrorCode::XmlMalformed);
        assert!(err.location.is_some());
    }

    #[test]
    fn descriptor_rejects_wrong_root() {
        let err = parse("<map columns=\"4\"/>").expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidRoot);
    }

    #[test]
    fn descriptor_requires_positive_columns() {
        let missing = parse(r#"<tileset><image source="a.png"/></tileset>"#).expect_err("err");
        assert_eq!(missing.code, ContentErrorCode::MissingField);

        let zero = parse(r#"<tileset columns="0"><image source="a.png"/></tileset>"#)
            .expect_err("err");
        assert_eq!(zero.code, ContentErrorCode::InvalidValue);

        let junk = parse(r#"<tileset columns="four"><image source="a.png"/></tileset>"#)
            .expect_err("err");
        assert_eq!(junk.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn descriptor_requires_image_source() {
        let no_image = parse(r#"<tileset columns="2"/>"#).expect_err("err");
        assert_eq!(no_image.code, ContentErrorCode::MissingField);

        let no_source = parse(r#"<tileset columns="2"><image width="4"/></tileset>"#)
            .expect_err("err");
        assert_eq!(no_source.code, ContentErrorCode::MissingField);
    }

    #[test]
    fn descriptor_rejects_tile_without_numeric_id() {
        let err = parse(r#"<tileset columns="2"><image source="a.png"/><tile id="x"/></tileset>"#)
            .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn load_tileset_resolves_image_relative_to_descriptor() {
        let temp = TempDir::new().expect("temp");
        let dir = temp.path().join("tiles");
        fs::create_dir_all(dir.join("art")).expect("mkdir");
        RgbaImage::from_pixel(32, 16, Rgba([10, 20, 30, 255]))
            .save(dir.join("art").join("sheet.png"))
            .expect("png");
        let tsx = dir.join("sheet.tsx");
        fs::write(
            &tsx,
            r#"<tileset columns="2"><image source="art/sheet.png"/>
                <tile id="1"><properties><property name="collision" value="true"/></properties></tile>
            </tileset>"#,
        )
        .expect("write");

        let loaded = load_tileset(&tsx, 7, (16, 16)).expect("tileset");
        assert_eq!(loaded.tileset.first_gid, 7);
        assert_eq!(loaded.tileset.image.width, 32);
        assert_eq!(loaded.tileset.image.height, 16);
        assert_eq!(loaded.tileset.tile_width, 16);
        assert_eq!(&loaded.tileset.image.rgba[0..4], &[10, 20, 30, 255]);
        assert_eq!(loaded.collidable_gids, vec![8]);
    }

    #[test]
    fn load_tileset_fails_fast_on_missing_image() {
        let temp = TempDir::new().expect("temp");
        let tsx = temp.path().join("sheet.tsx");
        fs::write(&tsx, r#"<tileset columns="2"><image source="gone.png"/></tileset>"#)
            .expect("write");

        let err = load_tileset(&tsx, 1, (16, 16))
            .err()
            .expect("missing image must fail");
        assert_eq!(err.code, ContentErrorCode::ImageLoad);
        assert!(err.file_path.ends_with("gone.png"));
    }
}
