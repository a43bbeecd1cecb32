//! PDF fixtures shared by the unit tests.
//!
//! Every fixture page is US Letter (inherited from the page tree) and can use
//! four fonts: `F1` is plain Helvetica without widths, `F2` is a synthetic font
//! whose glyphs are all 1000 units wide with ascent 800 and descent -200, so
//! boxes come out as round numbers.
//!
//! `F3` is an Identity-H Type0 font in the style of browser and office
//! exports. Its codes only make sense through its ToUnicode CMap:
//! `<0001>`..`<0005>` draw `#Name`, `<0006>` draws `Image`, `<0009>` the
//! `fi` ligature and `<0010>`..`<0019>` the digits. Every CID is 500 units
//! wide through `/W` except `<0006>` which is 1000 (the `DW`).
//!
//! `F4` is the unit-width font re-encoded with `/Differences` so that
//! codes 1 to 5 draw `#Name`.

use lopdf::{Document as LoDocument, Object as LoObject, Stream as LoStream, dictionary};
use std::path::{Path, PathBuf};

pub(crate) struct PageSpec {
    content: String,
    form: Option<(String, [f32; 6])>,
}

impl PageSpec {
    pub fn raw(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            form: None,
        }
    }

    /// One Helvetica line near the top of the page.
    pub fn text(text: &str) -> Self {
        Self::raw(format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text))
    }

    /// Page that only draws form `Fm1`, whose content is `form_content`.
    pub fn with_form(form_content: impl Into<String>, matrix: [f32; 6]) -> Self {
        Self {
            content: "/Fm1 Do".to_string(),
            form: Some((form_content.into(), matrix)),
        }
    }
}

const IDENTITY_UCS: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
3 beginbfchar
<0001> <0023>
<0006> <0049006D006100670065>
<0009> <00660069>
endbfchar
2 beginbfrange
<0002> <0005> [<004E> <0061> <006D> <0065>]
<0010> <0019> <0030>
endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end
";

pub(crate) fn build_pdf_bytes(pages: &[PageSpec]) -> Vec<u8> {
    let mut doc = LoDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let helvetica_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => "Unit",
        "Flags" => 32,
        "FontBBox" => vec![0.into(), (-200).into(), 1000.into(), 800.into()],
        "ItalicAngle" => 0,
        "Ascent" => 800,
        "Descent" => -200,
        "CapHeight" => 700,
        "StemV" => 80,
    });
    let unit_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Unit",
        "FirstChar" => 32,
        "LastChar" => 126,
        "Widths" => (32..=126).map(|_| LoObject::Integer(1000)).collect::<Vec<_>>(),
        "FontDescriptor" => descriptor_id,
    });
    let to_unicode_id = doc.add_object(LoStream::new(dictionary! {}, IDENTITY_UCS.to_vec()));
    let cid_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => "AAAAAA+Unit",
        "CIDSystemInfo" => dictionary! {
            "Registry" => LoObject::string_literal("Adobe"),
            "Ordering" => LoObject::string_literal("Identity"),
            "Supplement" => 0,
        },
        "DW" => 1000,
        "W" => vec![
            1.into(),
            LoObject::Array(vec![500.into(), 500.into()]),
            3.into(),
            5.into(),
            500.into(),
            9.into(),
            0x19.into(),
            500.into(),
        ],
        "FontDescriptor" => descriptor_id,
    });
    let type0_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => "AAAAAA+Unit",
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![cid_font_id.into()],
        "ToUnicode" => to_unicode_id,
    });
    let differences_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Unit",
        "FirstChar" => 1,
        "LastChar" => 126,
        "Widths" => (1..=126).map(|_| LoObject::Integer(1000)).collect::<Vec<_>>(),
        "Encoding" => dictionary! {
            "Type" => "Encoding",
            "BaseEncoding" => "WinAnsiEncoding",
            "Differences" => vec![
                1.into(),
                "numbersign".into(),
                "N".into(),
                "a".into(),
                "m".into(),
                "e".into(),
            ],
        },
        "FontDescriptor" => descriptor_id,
    });
    let fonts = dictionary! {
        "F1" => helvetica_id,
        "F2" => unit_id,
        "F3" => type0_id,
        "F4" => differences_id,
    };
    let resources_id = doc.add_object(dictionary! { "Font" => fonts.clone() });

    let mut kids = Vec::with_capacity(pages.len());
    for spec in pages {
        let content_id = doc.add_object(LoStream::new(
            dictionary! {},
            spec.content.as_bytes().to_vec(),
        ));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        };
        if let Some((form_content, matrix)) = &spec.form {
            let form_id = doc.add_object(LoStream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                    "Matrix" => matrix.iter().map(|v| LoObject::from(*v)).collect::<Vec<_>>(),
                    "Resources" => resources_id,
                },
                form_content.as_bytes().to_vec(),
            ));
            page.set(
                "Resources",
                dictionary! {
                    "Font" => fonts.clone(),
                    "XObject" => dictionary! { "Fm1" => form_id },
                },
            );
        }
        kids.push(doc.add_object(page).into());
    }

    doc.objects.insert(
        pages_id,
        LoObject::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages.len() as i64,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save");
    out
}

pub(crate) fn write_pdf(path: &Path, pages: &[PageSpec]) {
    std::fs::write(path, build_pdf_bytes(pages)).expect("write pdf");
}

pub(crate) fn unique_temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "pdfstamp_{}_{}_{}",
        label,
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("mkdir");
    dir
}
