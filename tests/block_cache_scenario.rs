mod common;

use archive_vfs::bytesource::ByteSource;
use common::Fixture;

#[tokio::test]
async fn lazy_sequential_file_is_randomly_readable_through_the_vfs() {
    let fx = Fixture::new();
    let data: Vec<u8> = (0..20_000u32).map(|i| (i % 256) as u8).collect();
    let factory = fx.sequential_factory("archive-member", &data);

    fx.vfs
        .create_file("payload", 0, ByteSource::LazySequential(factory), Some(data.len() as u64), 0o644, 0, None, None)
        .await
        .unwrap();
    fx.vfs.seal_all();

    let mut file = fx.vfs.open("payload").await.unwrap();
    let mut buf = vec![0u8; 100];

    let n = file.read(&mut buf).await.unwrap();
    assert_eq!(n, 100);
    assert_eq!(&buf[..n], &data[..100]);

    // Non-sequential follow-up read forces the adapter to reopen from scratch.
    let mut tail = vec![0u8; 50];
    let mut positioned = fx.vfs.open("payload").await.unwrap();
    let mut skip = vec![0u8; 19_000];
    positioned.read(&mut skip).await.unwrap();
    let n = positioned.read(&mut tail).await.unwrap();
    assert_eq!(n, 50);
    assert_eq!(&tail[..n], &data[19_000..19_050]);
}

#[tokio::test]
async fn two_opens_of_the_same_entry_share_one_adapter() {
    let fx = Fixture::new();
    let data = vec![7u8; 5000];
    let factory = fx.sequential_factory("shared-member", &data);

    fx.vfs
        .create_file("f", 0, ByteSource::LazySequential(factory), Some(data.len() as u64), 0o644, 0, None, None)
        .await
        .unwrap();
    fx.vfs.seal_all();

    let mut a = fx.vfs.open("f").await.unwrap();
    let mut b = fx.vfs.open("f").await.unwrap();
    let mut buf_a = vec![0u8; 10];
    let mut buf_b = vec![0u8; 10];
    a.read(&mut buf_a).await.unwrap();
    b.read(&mut buf_b).await.unwrap();
    assert_eq!(buf_a, buf_b);
}
