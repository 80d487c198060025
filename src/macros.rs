macro_rules! emit {
    ($builder:expr) => {
        writeln!($builder.output)
    };

    ($builder:expr, $($format:tt)*) => {{
        $builder.indent()?;
        writeln!($builder.output, $($format)*)
    }};
}
