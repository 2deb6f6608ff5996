use std::fs;

use bundle_fs::{BundlePath, Error, copy_tree, link_dir, read_text, relative_prefix, write_text};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

mod copy_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn copies_nested_files() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("deep/er")).unwrap();
        fs::write(src.join("top.txt"), "top").unwrap();
        fs::write(src.join("deep/er/leaf.txt"), "leaf").unwrap();

        let dest = temp.path().join("out");
        let copied = copy_tree(&src, &dest).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(fs::read_to_string(dest.join("top.txt")).unwrap(), "top");
        assert_eq!(
            fs::read_to_string(dest.join("deep/er/leaf.txt")).unwrap(),
            "leaf"
        );
    }

    #[test]
    fn missing_source_is_reported() {
        let temp = TempDir::new().unwrap();
        let result = copy_tree(&temp.path().join("nope"), &temp.path().join("out"));
        assert!(matches!(result, Err(Error::Walk { .. })));
    }
}

#[cfg(unix)]
mod link_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn relative_link_resolves_from_nested_target() {
        let temp = TempDir::new().unwrap();
        let bundle = temp.path();
        let aside = bundle.join(BundlePath::AsideDir).join("monorepo/lib");
        fs::create_dir_all(&aside).unwrap();
        write_text(&aside.join("marker"), "here").unwrap();

        let target = "products/lib";
        let src = format!(
            "{}{}/monorepo/lib",
            relative_prefix(target),
            BundlePath::AsideDir
        );
        link_dir(std::path::Path::new(&src), &bundle.join(target)).unwrap();

        assert_eq!(
            read_text(&bundle.join("products/lib/marker")).unwrap(),
            "here"
        );
    }

    #[test]
    fn refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("taken");
        fs::create_dir(&dest).unwrap();

        let result = link_dir(std::path::Path::new("elsewhere"), &dest);

        assert!(matches!(result, Err(Error::LinkExists { .. })));
    }
}
