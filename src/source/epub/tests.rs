use std::io::{Cursor, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::*;
use crate::model::Reference;

const CONTAINER_XML: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

const CONTENT_OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Programming Sample</dc:title>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="a" href="Text/chapterA.xhtml" media-type="application/xhtml+xml"/>
    <item id="b" href="Text/chapterB.xhtml" media-type="application/xhtml+xml"/>
    <item id="idx" href="Text/Index.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="a"/>
    <itemref idref="b"/>
    <itemref idref="idx"/>
  </spine>
</package>"#;

const TOC_NCX: &str = r#"<?xml version="1.0"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <docTitle><text>NCX Title</text></docTitle>
  <navMap>
    <navPoint id="a" playOrder="1">
      <navLabel><text>Chapter A</text></navLabel>
      <content src="Text/chapterA.xhtml"/>
    </navPoint>
    <navPoint id="a2" playOrder="2">
      <navLabel><text>Chapter A, part two</text></navLabel>
      <content src="Text/chapterA.xhtml#part2"/>
    </navPoint>
    <navPoint id="b" playOrder="3">
      <navLabel><text>Chapter B</text></navLabel>
      <content src="Text/chapterB.xhtml"/>
    </navPoint>
  </navMap>
</ncx>"#;

const CHAPTER_A: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><body>
<h1>Chapter A</h1>
<span id="page_5"/>
<h2>Getting Started</h2>
<p>text</p>
<span id="page_12"/>
</body></html>"#;

const CHAPTER_B: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><body>
<h1>Chapter B</h1>
<h2>Later Topics</h2>
<span id="page_3"/>
</body></html>"#;

const INDEX_XHTML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><body>
<p class="Index-Head">F</p>
<p class="Index-1">Foo, <a href="chapterB.xhtml#page_3">3</a>, <a href="chapterA.xhtml#page_5">5</a></p>
<p class="Index-2">bar, <a href="chapterA.xhtml#page_12">12</a></p>
<p class="Index-1">Fizz, <i>see</i> Foo</p>
</body></html>"#;

fn build_epub(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        writer
            .write_all(contents.as_bytes())
            .expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

fn sample_epub() -> Vec<u8> {
    build_epub(&[
        ("mimetype", "application/epub+zip"),
        ("META-INF/container.xml", CONTAINER_XML),
        ("OEBPS/content.opf", CONTENT_OPF),
        ("OEBPS/toc.ncx", TOC_NCX),
        ("OEBPS/Text/chapterA.xhtml", CHAPTER_A),
        ("OEBPS/Text/chapterB.xhtml", CHAPTER_B),
        ("OEBPS/Text/Index.xhtml", INDEX_XHTML),
    ])
}

fn extract(bytes: Vec<u8>, fallback_title: &str) -> RawExtraction {
    let mut container = BookContainer::from_reader(Cursor::new(bytes)).expect("open container");
    extract_from_container(&mut container, fallback_title).expect("extract epub")
}

#[test]
fn extracts_toc_index_and_subheadings_from_a_packaged_book() {
    let extraction = extract(sample_epub(), "fallback");

    assert_eq!(extraction.book_title, "Programming Sample");
    assert_eq!(
        extraction.toc,
        TableOfContents::Files(vec![
            ChapterFile {
                title: "Chapter A".to_string(),
                file_id: "chapterA.xhtml".to_string(),
                order: 0,
            },
            ChapterFile {
                title: "Chapter B".to_string(),
                file_id: "chapterB.xhtml".to_string(),
                order: 1,
            },
        ])
    );

    assert_eq!(extraction.index_entries.len(), 2);
    assert_eq!(extraction.index_entries[0].term, "Foo");
    assert_eq!(
        extraction.index_entries[0].refs,
        vec![
            Reference::in_file("chapterB.xhtml", 3),
            Reference::in_file("chapterA.xhtml", 5),
        ]
    );
    assert_eq!(extraction.index_entries[1].term, "Foo");
    assert_eq!(extraction.index_entries[1].subentry, "bar");

    assert_eq!(extraction.subheadings.lookup("chapterA.xhtml", 5), "");
    assert_eq!(
        extraction.subheadings.lookup("chapterA.xhtml", 12),
        "Getting Started"
    );
    assert_eq!(
        extraction.subheadings.lookup("chapterB.xhtml", 3),
        "Later Topics"
    );
}

#[test]
fn missing_container_pointer_falls_back_to_default_package_path() {
    let opf = CONTENT_OPF.replace("Text/", "");
    let ncx = TOC_NCX.replace("Text/", "");
    let bytes = build_epub(&[
        ("content.opf", opf.as_str()),
        ("toc.ncx", ncx.as_str()),
        ("chapterA.xhtml", CHAPTER_A),
        ("chapterB.xhtml", CHAPTER_B),
    ]);

    let extraction = extract(bytes, "fallback");
    assert_eq!(extraction.toc.len(), 2);
    assert!(extraction.index_entries.is_empty());
}

#[test]
fn title_falls_back_to_navigation_then_file_stem() {
    let untitled_opf = CONTENT_OPF.replace("<dc:title>Programming Sample</dc:title>", "");
    let with_ncx_title = build_epub(&[
        ("META-INF/container.xml", CONTAINER_XML),
        ("OEBPS/content.opf", untitled_opf.as_str()),
        ("OEBPS/toc.ncx", TOC_NCX),
    ]);
    assert_eq!(extract(with_ncx_title, "stem").book_title, "NCX Title");

    let untitled_ncx = TOC_NCX.replace("<docTitle><text>NCX Title</text></docTitle>", "");
    let without_titles = build_epub(&[
        ("META-INF/container.xml", CONTAINER_XML),
        ("OEBPS/content.opf", untitled_opf.as_str()),
        ("OEBPS/toc.ncx", untitled_ncx.as_str()),
    ]);
    let extraction = extract(without_titles, "stem");
    assert_eq!(extraction.book_title, "stem");
    assert!(extraction.subheadings.lookup("chapterA.xhtml", 5).is_empty());
}

#[test]
fn epub3_navigation_document_is_used_without_ncx() {
    let opf = r#"<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata><dc:title xmlns:dc="http://purl.org/dc/elements/1.1/">Nav Only</dc:title></metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="one" href="one.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine><itemref idref="one"/></spine>
</package>"#;
    let nav = r#"<html><body><nav epub:type="toc"><ol>
<li><a href="one.xhtml">First Chapter</a></li>
</ol></nav></body></html>"#;
    let chapter = r#"<html><body><h2>Intro</h2><span id="page_1"/></body></html>"#;

    let bytes = build_epub(&[
        ("META-INF/container.xml", CONTAINER_XML),
        ("OEBPS/content.opf", opf),
        ("OEBPS/nav.xhtml", nav),
        ("OEBPS/one.xhtml", chapter),
    ]);

    let extraction = extract(bytes, "stem");
    assert_eq!(
        extraction.toc,
        TableOfContents::Files(vec![ChapterFile {
            title: "First Chapter".to_string(),
            file_id: "one.xhtml".to_string(),
            order: 0,
        }])
    );
    assert_eq!(extraction.subheadings.lookup("one.xhtml", 1), "Intro");
}

#[test]
fn extract_epub_reports_missing_file() {
    let error = extract_epub(Path::new("/nonexistent/book.epub")).expect_err("missing file");
    assert!(error.to_string().contains("EPUB not found"));
}
