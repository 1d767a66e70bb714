pub struct Kiln {}

static KILN_STATIC: std::sync::OnceLock<KilnStatic> = std::sync::OnceLock::new();

struct KilnStatic {}

impl KilnStatic {
    fn init(app_name: &str) -> &'static Self {
        kiln_profiling::profile_function!();

        KILN_STATIC.get_or_init(|| {
            env_logger::builder()
                .filter_level(log::LevelFilter::Info)
                .filter_module("gltf", log::LevelFilter::Warn)
                .parse_default_env()
                .init();

            log::debug!("{} started", app_name);
            Self {}
        })
    }
}

impl Kiln {
    pub fn new(app_name: &str) -> Self {
        KilnStatic::init(app_name);

        Self {}
    }
}
