use divan::AllocProfiler;

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    divan::main();
}

pub mod read {
    use std::io::prelude::*;
    use std::path::PathBuf;
    use std::sync::OnceLock;

    use asar_archive::{Archive, PackOptions};
    use divan::Bencher;
    use tempfile::TempDir;

    const FILES: usize = 256;

    fn fixture() -> &'static (TempDir, PathBuf) {
        static FIXTURE: OnceLock<(TempDir, PathBuf)> = OnceLock::new();
        FIXTURE.get_or_init(|| {
            let dir = tempfile::tempdir().unwrap();
            let src = dir.path().join("src");
            for i in 0..FILES {
                let path = src.join(format!("dir{}", i % 16)).join(format!("file{i}.txt"));
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(path, vec![i as u8; 1024 + i]).unwrap();
            }

            let dest = dir.path().join("bench.asar");
            tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap()
                .block_on(Archive::pack(&src, &dest, &PackOptions::default()))
                .unwrap();
            (dir, dest)
        })
    }

    #[divan::bench]
    fn open(bencher: Bencher) {
        let (_, path) = fixture();
        bencher.bench(|| {
            divan::black_box(Archive::open(path).unwrap());
        });
    }

    #[divan::bench]
    fn lookup(bencher: Bencher) {
        let archive = Archive::open(&fixture().1).unwrap();
        bencher.bench_local(|| {
            divan::black_box(archive.get_node("dir7/file135.txt"));
        });
    }

    #[divan::bench]
    fn list(bencher: Bencher) {
        let archive = Archive::open(&fixture().1).unwrap();
        bencher.bench_local(|| {
            divan::black_box(archive.list());
        });
    }

    #[divan::bench(sample_count = 1)]
    fn read_file_all(bencher: Bencher) {
        let mut archive = Archive::open(&fixture().1).unwrap();
        let paths = archive
            .list()
            .into_iter()
            .filter(|p| p.ends_with(".txt"))
            .collect::<Vec<_>>();

        bencher.bench_local(move || {
            let mut buffer = Vec::new();
            for path in &paths {
                let mut file = archive.by_path(path).unwrap();
                file.read_to_end(&mut buffer).unwrap();
                buffer.clear();
            }
        });
    }
}
