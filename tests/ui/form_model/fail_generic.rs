use aarogyam::form::FormModel;

#[derive(FormModel)]
struct Draft<T> {
    value: T,
}

fn main() {}
